//! Bundle format: directory layout, manifest, archive codec and the
//! composed read view.

pub mod archive;
pub mod layout;
pub mod manifest;
pub mod view;

pub use archive::{ArchiveContents, archive_file_name, pack, read_manifest, unpack};
pub use manifest::{ContextEntry, FileEntry, Manifest, ManifestDependency};
pub use view::Bundle;
