use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::path::PathBuf;
use tracing::info;

use super::create_output;
use crate::app::ports::EventlistOutputPort;
use crate::config::{Participant, PathTemplate};
use crate::constants::{format_float, EVENTLIST};
use crate::error::{PrepError, Result};
use crate::manifest::OutputFile;
use crate::types::CorrectedEvent;

/// Writes corrected eventlists in the text format the EEG toolbox imports
pub struct FileEventlistOutputAdapter {
    root: PathBuf,
    template: PathTemplate,
}

impl FileEventlistOutputAdapter {
    pub fn new(root: PathBuf, template: PathTemplate) -> Self {
        Self { root, template }
    }
}

/// One eventlist line, in header order
pub fn eventlist_fields(event: &CorrectedEvent) -> [String; 11] {
    [
        event.item.to_string(),
        EVENTLIST.epoch.to_string(),
        event.bin_id.to_string(),
        EVENTLIST.label.to_string(),
        format_float(event.onset),
        event
            .delta_ms
            .map(format_float)
            .unwrap_or_else(|| EVENTLIST.undefined_delta.to_string()),
        EVENTLIST.duration.to_string(),
        EVENTLIST.flags.to_string(),
        EVENTLIST.enable.to_string(),
        EVENTLIST.bin_list_open.to_string(),
        EVENTLIST.bin_list_close.to_string(),
    ]
}

impl EventlistOutputPort for FileEventlistOutputAdapter {
    fn write_eventlist(&self, participant: &Participant, events: &[CorrectedEvent]) -> Result<OutputFile> {
        let path = self.template.render(&self.root, participant);
        info!(participant = %participant.label, path = %path.display(), "Writing eventlist");

        // The toolbox reads placeholders such as "" literally, so nothing is quoted
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(create_output(&path)?);
        writer.write_record(EVENTLIST.header)?;
        for event in events {
            writer.write_record(&eventlist_fields(event))?;
        }
        writer.flush().map_err(|e| PrepError::io(&path, e))?;
        drop(writer);

        OutputFile::describe(&path, events.len())
    }
}
