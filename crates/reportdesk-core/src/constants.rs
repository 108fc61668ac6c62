//! Wire-level constants shared by the client and the job controller.

/// Endpoint issuing presigned upload credentials.
pub const UPLOAD_CREDENTIAL_PATH: &str = "/generate-upload-credential";

/// Endpoint reporting job status (`?jobId=`).
pub const JOB_STATUS_PATH: &str = "/job-status";

/// Endpoint answering questions about a finished artifact.
pub const CHAT_PATH: &str = "/chat";

/// Object metadata header carrying the client-minted job id.
pub const JOB_ID_METADATA_HEADER: &str = "x-amz-meta-job-id";

/// Object metadata header carrying the original (percent-encoded) file name.
pub const ORIGINAL_FILENAME_METADATA_HEADER: &str = "x-amz-meta-original-filename";

/// Content type used when a file's type cannot be inferred from its name.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maximum number of characters of server-provided failure detail shown to the user.
pub const FAILURE_DETAIL_DISPLAY_CHARS: usize = 300;

/// Shown when the chat endpoint answers with an empty string.
pub const EMPTY_ANSWER_TEXT: &str = "The assistant did not return an answer.";
