pub mod continuity;
pub mod document_parser;
pub mod page_ctx;
pub mod section_extractor;

pub use continuity::ContinuityTracker;
pub use document_parser::{DocumentParser, ParsedDocument, SourceKind};
pub use page_ctx::PageCtx;
pub use section_extractor::{ExtractionEvent, SectionExtractor, DEFAULT_CONTINUATION_WINDOW};
