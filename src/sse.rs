/// Incremental server-sent-event parser.
///
/// The transport hands us arbitrary text chunks whose boundaries may fall
/// anywhere, including mid-line.  Each parser owns its carry-over buffer;
/// `feed` returns only the events completed by the chunk it was given.

#[derive(Debug, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Default)]
pub struct EventStreamParser {
    buffer: String,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded chunk, returning every event completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        // normalize CRLF so the blank-line scan only deals with '\n'
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut events = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let block = self.buffer[..boundary].to_string();
            self.buffer.drain(..boundary + 2);
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }

        events
    }
}

/// Parse one blank-line-terminated block.  Multiple `data:` lines join with
/// '\n'; comment lines (leading ':') are dropped; a block with no data field
/// produces no event.
fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim_start().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
    })
}
