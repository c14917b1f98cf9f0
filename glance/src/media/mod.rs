//! Media handling: intake, normalization, temporary files and remote
//! registration.
//!
//! The pieces are used in call order by [`Analyzer`](crate::analysis::Analyzer):
//!
//! 1. [`UploadedMedia`] validates the file name against the allowlist.
//! 2. [`normalize_image`] shrinks images into a bounded RGB JPEG.
//! 3. [`with_temp_asset`] owns the on-disk copy for the lifetime of a request.
//! 4. [`register_and_wait`] uploads videos to a [`MediaStore`] and waits
//!    until they can be referenced by the model.

pub mod intake;
pub mod normalize;
pub mod registry;
pub mod temp;

pub use intake::{MediaKind, UploadedMedia};
pub use normalize::{Bounds, NormalizedImage, normalize_image, thumbnail_dimensions};
pub use registry::{
    FileState, MediaStore, PollPolicy, RemoteFile, SharedMediaStore, register_and_wait,
    wait_until_active,
};
pub use temp::{TemporaryAsset, with_temp_asset};
