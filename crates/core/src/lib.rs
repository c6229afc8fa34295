mod duplicates;
mod engine;
mod error;
mod finding;
mod model;
mod parser;
mod report;
mod schema;
mod semantic;
mod source;

pub use duplicates::{find_duplicates, normalize_url};
pub use engine::{validate_group, validate_project, validate_records, ProjectInput, ProjectOutcome};
pub use error::{BookmarkError, Result};
pub use finding::{Finding, FindingKind, Rule};
pub use model::{BookmarkRecord, PackageNode, ProjectBookmarkSet, RawRecord, RecordRef};
pub use parser::{parse_project, parse_records};
pub use report::{ProjectStatus, ProjectSummary, Report};
pub use schema::{SchemaValidator, BOOKMARK_SCHEMA, MAX_PACKAGE_DEPTH};
pub use semantic::{check_domain, check_record};
pub use source::{classify_path, source_label, SourceKind};
