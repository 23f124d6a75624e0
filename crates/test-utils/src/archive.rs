//! Synthetic archives: concatenated messages plus a matching `.idx` inventory.

/// Accumulates messages and records the inventory line for each.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    reference: String,
    forecast_hour: u32,
    bytes: Vec<u8>,
    lines: Vec<String>,
}

impl ArchiveBuilder {
    /// `reference` is the run as `YYYYMMDDHH`.
    pub fn new(reference: &str, forecast_hour: u32) -> Self {
        Self {
            reference: reference.to_string(),
            forecast_hour,
            bytes: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn forecast_descriptor(&self) -> String {
        if self.forecast_hour == 0 {
            "anl".to_string()
        } else {
            format!("{} hour fcst", self.forecast_hour)
        }
    }

    /// Append one message.
    pub fn push(mut self, variable: &str, level: &str, message: &[u8]) -> Self {
        let line = format!(
            "{}:{}:d={}:{}:{}:{}:",
            self.lines.len() + 1,
            self.bytes.len(),
            self.reference,
            variable,
            level,
            self.forecast_descriptor()
        );
        self.lines.push(line);
        self.bytes.extend_from_slice(message);
        self
    }

    /// Append a filler message of `len` bytes that nothing decodes.
    pub fn push_filler(self, variable: &str, level: &str, len: usize) -> Self {
        let filler = vec![0xAB; len];
        self.push(variable, level, &filler)
    }

    /// Byte offset the next message will start at.
    pub fn next_offset(&self) -> usize {
        self.bytes.len()
    }

    /// The archive bytes and its inventory text.
    pub fn finish(self) -> (Vec<u8>, String) {
        let mut index = self.lines.join("\n");
        index.push('\n');
        (self.bytes, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_offsets_follow_archive() {
        let (bytes, index) = ArchiveBuilder::new("2024050112", 3)
            .push_filler("TMP", "surface", 100)
            .push("REFC", "entire atmosphere", &[1, 2, 3])
            .finish();

        assert_eq!(bytes.len(), 103);
        assert_eq!(
            index,
            "1:0:d=2024050112:TMP:surface:3 hour fcst:\n\
             2:100:d=2024050112:REFC:entire atmosphere:3 hour fcst:\n"
        );
    }
}
