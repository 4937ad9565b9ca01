pub mod continuity;
pub mod label;
pub mod loaders;
pub mod page;
pub mod registry;
pub mod section;
pub mod student;

pub use continuity::ContinuityState;
pub use label::{LabelMatch, QuestionLabel};
pub use loaders::{load_sections, save_sections};
pub use page::PageImage;
pub use registry::QuestionRegistry;
pub use section::{ExtractedSection, ExtractionKind, SectionMap};
pub use student::{PageRange, StudentRecord};
