//! Locating the package document inside the container.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::util::{local_name, strip_bom};

/// Fixed path of the container descriptor.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parse `META-INF/container.xml` and return the `full-path` of the first
/// `rootfile` declared under `rootfiles`. Later rootfiles are ignored.
pub fn root_file_path(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut in_rootfiles = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(e.name().as_ref()) == b"rootfiles" => {
                in_rootfiles = true;
            }
            Ok(Event::End(e)) if local_name(e.name().as_ref()) == b"rootfiles" => {
                in_rootfiles = false;
            }
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if in_rootfiles && local_name(e.name().as_ref()) == b"rootfile" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8(attr.value.to_vec())?);
                    }
                }
                return Err(Error::Format(
                    "rootfile element has no full-path attribute".into(),
                ));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::Format(
        "root file path not found in the EPUB container".into(),
    ))
}
