//! Upload brokering: presigned single PUTs and the S3 multipart protocol.

mod broker;
mod parts;
mod types;

pub(crate) use broker::metadata_bag;
pub use broker::UploadBroker;
pub use parts::parse_completed_parts;
pub use types::{
    CompleteMultipartRequest, CreateMultipartRequest, KeyQuery, MultipartCompleted,
    MultipartCreated, PartDescriptor, SignS3Params, SignedPart, SignedPut,
};
