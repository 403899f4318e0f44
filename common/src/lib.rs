//! Building blocks shared by rez binders: version ordering, version ranges,
//! and transactional package assembly.

pub mod package;
pub mod range;
pub mod version;

pub use package::{
    InstalledPackage, PACKAGE_FILE, PackageDescriptor, PackageError, PackageMaker, RootContext,
    make_dirs, validate_name,
};
pub use range::{RangeParseError, VersionRange};
pub use version::{Version, VersionParseError};
