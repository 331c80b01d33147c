pub mod boxes;
pub mod cursor;
pub mod fields;
pub mod parser;
pub mod registry;
pub mod report;
pub mod util;

pub use boxes::{BoxHeader, BoxNode, FourCC};
pub use cursor::ByteCursor;
pub use parser::{BoxReader, ParseError, ParseOptions, ParseOutcome, parse_boxes, read_box_header};
pub use registry::{BoxDecoder, BoxFields, Registry, default_registry};
pub use report::render;
