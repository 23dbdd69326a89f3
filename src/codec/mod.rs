pub mod blob;

pub use blob::{BlobError, BlobReader, BlobWriter};
