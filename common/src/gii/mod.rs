// gesetze-im-internet.de: law XML parsing, downloading and raw data storage

pub mod archive;
pub mod client;
pub mod location;
pub mod parsing;
pub mod toc;
pub mod xml;

pub use archive::LawArchive;
pub use client::{GiiClient, LawSource};
pub use location::{LawDataLocation, LocalDirectory};
pub use parsing::{parse_law, ParsedContentItem, ParsedLaw};
