/// Builds the concatenated stream: the header once, verbatim, then one
/// `<marker> <path>` / content / `<marker>` block per included file.
/// Content bytes are copied as-is.
#[derive(Debug, Clone)]
pub struct OutputAssembler {
    marker: String,
    buffer: Vec<u8>,
    blocks: usize,
}

impl OutputAssembler {
    pub fn new(header: &str, marker: &str) -> Self {
        OutputAssembler {
            marker: marker.to_string(),
            buffer: header.as_bytes().to_vec(),
            blocks: 0,
        }
    }

    pub fn append(&mut self, display_path: &str, content: &[u8]) {
        self.buffer.reserve(content.len() + 2 * self.marker.len() + display_path.len() + 4);
        self.buffer.extend_from_slice(self.marker.as_bytes());
        self.buffer.push(b' ');
        self.buffer.extend_from_slice(display_path.as_bytes());
        self.buffer.push(b'\n');
        self.buffer.extend_from_slice(content);
        self.buffer.push(b'\n');
        self.buffer.extend_from_slice(self.marker.as_bytes());
        self.buffer.push(b'\n');
        self.blocks += 1;
    }

    pub fn block_count(&self) -> usize {
        self.blocks
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_written_verbatim_once() {
        let mut out = OutputAssembler::new("HEADER", "```");
        out.append("a.txt", b"hello");
        out.append("b.txt", b"x\n");
        assert_eq!(out.block_count(), 2);
        assert_eq!(
            out.as_bytes(),
            b"HEADER``` a.txt\nhello\n```\n``` b.txt\nx\n\n```\n"
        );
    }

    #[test]
    fn binary_content_is_copied_unchanged() {
        let mut out = OutputAssembler::new("", "#");
        out.append("blob", &[0u8, 159, 146, 150, b'\n']);
        assert_eq!(out.into_bytes(), vec![b'#', b' ', b'b', b'l', b'o', b'b', b'\n', 0, 159, 146, 150, b'\n', b'\n', b'#', b'\n']);
    }

    #[test]
    fn no_files_yields_only_header() {
        let out = OutputAssembler::new("intro\n", "--");
        assert_eq!(out.as_bytes(), b"intro\n");
        assert_eq!(out.block_count(), 0);
    }
}
