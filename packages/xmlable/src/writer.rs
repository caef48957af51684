//! Streaming markup writer which tracks the state of every open element.
//!
//! Whether an element ends up self-closing, holding a value, or holding
//! children isn't known when its opening tag is written, so the `>` that ends
//! the opening tag is deferred until the first value or child arrives, or is
//! replaced by ` />` when the element is closed without either.

use crate::{
    do_if_err::DoIfErr,
    error::{
        Error,
        Result,
        error,
        ensure,
        bail,
    },
};
use std::{
    borrow::Cow,
    fmt::{self, Formatter, Debug},
    io::{self, Write},
};


/// Declaration written once, before any tag.
pub const PROLOGUE: &'static str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

const INDENT: &'static str = "\t";

/// Options controlling writer output.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct WriterOptions {
    /// Whether to escape markup characters in values and attribute values.
    /// Defaults to `false`, in which case callers must supply markup-safe
    /// strings.
    pub escape: bool,
}

impl WriterOptions {
    #[must_use]
    pub fn escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }
}

/// What an open element has received so far. `Value` and `Children` are
/// exclusive.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Content {
    /// Just opened. Its opening tag is still missing its `>`.
    Fresh,
    /// Holds a value, written inline after the opening tag.
    Value,
    /// Holds child elements.
    Children,
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    content: Content,
}

/// Writes a markup document to a `std::io::Write`, one tag at a time.
///
/// Dropping the writer closes every open tag, so the output is well-formed
/// up to the point the writer was abandoned. `close` does the same and hands
/// back the sink.
///
/// ```
/// use xmlable::TagWriter;
///
/// let mut out = Vec::new();
/// let mut writer = TagWriter::new(&mut out).unwrap();
/// writer.open_tag("book", &[]).unwrap();
/// writer.open_tag("title", &["lang", "it"]).unwrap();
/// writer.write_value("La Divina Commedia").unwrap();
/// writer.close_tag().unwrap();
/// writer.open_tag("isbn", &[]).unwrap();
/// writer.close().unwrap();
///
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
///      <book>\n\t<title lang=\"it\">La Divina Commedia</title>\n\t<isbn />\n</book>",
/// );
/// ```
pub struct TagWriter<W: Write> {
    stack: Vec<Element>,
    sink: Option<W>,
    broken: bool,
    /// Rest of a write the sink failed partway through. Teardown writes it
    /// before closing anything, so a tag is never left half written.
    unfinished: Option<Vec<u8>>,
    options: WriterOptions,
}

impl<W: Write> TagWriter<W> {
    pub fn new(sink: W) -> Result<Self> {
        Self::with_options(sink, WriterOptions::default())
    }

    /// Construct a writer and write the prologue.
    pub fn with_options(sink: W, options: WriterOptions) -> Result<Self> {
        let mut writer = TagWriter {
            stack: Vec::new(),
            sink: Some(sink),
            broken: false,
            unfinished: None,
            options,
        };
        writer.write(PROLOGUE)?;
        Ok(writer)
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether there are no open elements.
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// Whether an IO error has occurred. A broken writer rejects further tag
    /// API calls, but still closes its open tags on teardown.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Open a tag. `attrs` are name/value pairs laid out flat, so it must be
    /// of even length.
    pub fn open_tag(&mut self, name: &str, attrs: &[&str]) -> Result<()> {
        self.ensure_usable()?;
        ensure!(
            attrs.len() % 2 == 0,
            InvalidAttributes,
            Some(self),
            "uneven number of attributes ({}) for tag {}",
            attrs.len(),
            name,
        );
        let parent = self.stack.last().map(|top| top.content);
        if parent == Some(Content::Value) {
            bail!(
                ApiUsage,
                Some(self),
                "cannot open tag {} in element which already has a value",
                name,
            );
        }

        let depth = self.stack.len();
        if let Some(content) = parent {
            if content == Content::Fresh {
                self.write(">")?;
            }
            // the parent's opening tag is finished now, so teardown must
            // not self-close it
            self.mark_top(Content::Children);
            self.write(&format!("\n{}", INDENT.repeat(depth)))?;
        }

        let mut start = format!("<{}", name);
        for pair in attrs.chunks_exact(2) {
            start.push(' ');
            start.push_str(pair[0]);
            start.push_str("=\"");
            if self.options.escape {
                start.push_str(&escape(pair[1], true));
            } else {
                start.push_str(pair[1]);
            }
            start.push('"');
        }

        // pushed first, so teardown self-closes the tag if the sink takes
        // only part of it
        self.stack.push(Element {
            name: name.to_owned(),
            content: Content::Fresh,
        });
        if let Err(e) = self.write(&start) {
            if self.unfinished.is_none() {
                // nothing of the tag reached the sink
                self.stack.pop();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Close the most recently opened tag. Does nothing if no tag is open.
    pub fn close_tag(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.close_top()
    }

    /// Write a value into the most recently opened tag. Does nothing if no
    /// tag is open, or if that tag already has children.
    pub fn write_value(&mut self, text: &str) -> Result<()> {
        self.ensure_usable()?;
        let content = match self.stack.last() {
            Some(top) => top.content,
            None => return Ok(()),
        };
        match content {
            Content::Children => {
                trace!("ignoring value written into element with children");
                Ok(())
            }
            Content::Value => bail!(
                ApiUsage,
                Some(self),
                "element {} already has a value",
                self.stack[self.stack.len() - 1].name,
            ),
            Content::Fresh => {
                self.write(">")?;
                self.mark_top(Content::Value);
                self.write_escaped(text, false)
            }
        }
    }

    /// Close every open tag, flush, and hand back the sink.
    pub fn close(mut self) -> Result<W> {
        let result = self.teardown();
        let sink = self.sink.take();
        result?;
        sink.ok_or_else(|| error!(ApiUsage, None, "writer already closed"))
    }

    fn ensure_usable(&self) -> Result<()> {
        ensure!(!self.broken, ApiUsage, Some(self), "usage after IO error");
        Ok(())
    }

    fn mark_top(&mut self, content: Content) {
        if let Some(top) = self.stack.last_mut() {
            top.content = content;
        }
    }

    fn close_top(&mut self) -> Result<()> {
        let end = match self.stack.last() {
            Some(top) => match top.content {
                Content::Fresh => " />".to_owned(),
                Content::Value => format!("</{}>", top.name),
                Content::Children => format!(
                    "\n{}</{}>",
                    INDENT.repeat(self.stack.len() - 1),
                    top.name,
                ),
            },
            None => return Ok(()),
        };
        let result = self.write(&end);
        // a partly written end tag still ends the element
        if result.is_ok() || self.unfinished.is_some() {
            self.stack.pop();
        }
        result
    }

    /// Close whatever is still open and flush, regardless of brokenness.
    /// Reports the first error but keeps going.
    fn teardown(&mut self) -> Result<()> {
        let mut first_err = None;
        if let Err(e) = self.finish_unfinished() {
            first_err.get_or_insert(e);
        }
        while !self.stack.is_empty() {
            let depth = self.stack.len();
            if let Err(e) = self.close_top() {
                first_err.get_or_insert(e);
                if let Err(e) = self.finish_unfinished() {
                    first_err.get_or_insert(e);
                }
                if self.stack.len() == depth {
                    self.stack.pop();
                }
            }
        }
        if let Some(ref mut sink) = self.sink {
            if let Err(e) = sink.flush() {
                first_err.get_or_insert(Error::from(e));
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn finish_unfinished(&mut self) -> Result<()> {
        if let (Some(rest), Some(sink)) = (self.unfinished.take(), self.sink.as_mut()) {
            sink.write_all(&rest)?;
        }
        Ok(())
    }

    fn write_escaped(&mut self, text: &str, attr: bool) -> Result<()> {
        if self.options.escape {
            let escaped = escape(text, attr);
            self.write(&escaped)
        } else {
            self.write(text)
        }
    }

    fn write(&mut self, s: &str) -> Result<()> {
        let sink = match self.sink {
            Some(ref mut sink) => sink,
            None => bail!(ApiUsage, None, "usage of closed writer"),
        };
        let bytes = s.as_bytes();
        let (accepted, result) = write_counted(sink, bytes);
        if result.is_err() && accepted > 0 {
            self.unfinished = Some(bytes[accepted..].to_vec());
        }
        let broken = &mut self.broken;
        result
            .map_err(Error::from)
            .do_if_err(|e| {
                trace!(%e, accepted, "tag writer broken by IO error");
                *broken = true;
            })
    }
}

/// Like `write_all`, but also reports how many bytes the sink accepted
/// before failing.
fn write_counted<W: Write>(sink: &mut W, bytes: &[u8]) -> (usize, io::Result<()>) {
    let mut accepted = 0;
    while accepted < bytes.len() {
        match sink.write(&bytes[accepted..]) {
            Ok(0) => return (
                accepted,
                Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write whole buffer")),
            ),
            Ok(n) => accepted += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
            Err(e) => return (accepted, Err(e)),
        }
    }
    (accepted, Ok(()))
}

impl<W: Write> Drop for TagWriter<W> {
    fn drop(&mut self) {
        if self.sink.is_none() {
            return;
        }
        if let Err(e) = self.teardown() {
            warn!(%e, "error closing tags of dropped tag writer");
        }
    }
}

impl<W: Write> Debug for TagWriter<W> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("TagWriter {\n")?;
        f.write_fmt(format_args!("    broken: {},\n", self.broken))?;
        f.write_fmt(format_args!("    closed: {},\n", self.sink.is_none()))?;
        if let Some(ref rest) = self.unfinished {
            f.write_fmt(format_args!("    unfinished: {} bytes,\n", rest.len()))?;
        }
        f.write_str("    stack:\n")?;
        for (i, element) in self.stack.iter().enumerate() {
            f.write_fmt(format_args!(
                "    {:02}. <{}> {:?}\n",
                i, element.name, element.content,
            ))?;
        }
        f.write_str("}")
    }
}

fn escape(text: &str, attr: bool) -> Cow<'_, str> {
    let needs_escape = |c: char| matches!(c, '&' | '<' | '>') || (attr && c == '"');
    if !text.chars().any(needs_escape) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io;

    fn written<F>(f: F) -> String
    where
        F: FnOnce(&mut TagWriter<&mut Vec<u8>>) -> Result<()>,
    {
        let mut out = Vec::new();
        let mut writer = TagWriter::new(&mut out).unwrap();
        f(&mut writer).unwrap();
        writer.close().unwrap();
        String::from_utf8(out).unwrap()
    }

    fn doc(body: &str) -> String {
        format!("{}{}", PROLOGUE, body)
    }

    #[test]
    fn empty_tag_self_closes() {
        let out = written(|w| {
            w.open_tag("root", &[])?;
            w.close_tag()
        });
        assert_eq!(out, doc("<root />"));
    }

    #[test]
    fn attributes_in_order() {
        let out = written(|w| {
            w.open_tag("person", &["id", "123", "name", "Dante Alighieri"])?;
            w.close_tag()
        });
        assert_eq!(out, doc("<person id=\"123\" name=\"Dante Alighieri\" />"));
    }

    #[test]
    fn value_written_inline() {
        let out = written(|w| {
            w.open_tag("name", &[])?;
            w.write_value("Dante Alighieri")?;
            w.close_tag()
        });
        assert_eq!(out, doc("<name>Dante Alighieri</name>"));
    }

    #[test]
    fn nested_tags_indented() {
        let out = written(|w| {
            w.open_tag("book", &[])?;
            w.open_tag("title", &[])?;
            w.write_value("La Divina Commedia")?;
            w.close_tag()?;
            w.open_tag("author", &[])?;
            w.write_value("Dante Alighieri")?;
            w.close_tag()?;
            w.close_tag()
        });
        assert_eq!(
            out,
            doc("<book>\n\t<title>La Divina Commedia</title>\n\t<author>Dante Alighieri</author>\n</book>"),
        );
    }

    #[test]
    fn indentation_follows_depth() {
        let out = written(|w| {
            w.open_tag("a", &[])?;
            w.open_tag("b", &[])?;
            w.open_tag("c", &[])?;
            w.write_value("x")?;
            w.close_tag()?;
            w.open_tag("d", &[])?;
            w.close_tag()?;
            w.close_tag()?;
            w.close_tag()
        });
        assert_eq!(out, doc("<a>\n\t<b>\n\t\t<c>x</c>\n\t\t<d />\n\t</b>\n</a>"));
    }

    #[test]
    fn uneven_attributes_rejected_without_output() {
        let mut out = Vec::new();
        let mut writer = TagWriter::new(&mut out).unwrap();
        let e = writer.open_tag("person", &["id", "123", "name"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidAttributes);
        assert!(writer.is_idle());
        assert!(!writer.is_broken());
        writer.close().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), PROLOGUE);
    }

    #[test]
    fn close_and_value_on_empty_stack_do_nothing() {
        let out = written(|w| {
            w.close_tag()?;
            w.write_value("stray")
        });
        assert_eq!(out, PROLOGUE);
    }

    #[test]
    fn value_after_children_ignored() {
        let out = written(|w| {
            w.open_tag("a", &[])?;
            w.open_tag("b", &[])?;
            w.close_tag()?;
            w.write_value("ignored")?;
            w.close_tag()
        });
        assert_eq!(out, doc("<a>\n\t<b />\n</a>"));
    }

    #[test]
    fn second_value_rejected() {
        let mut out = Vec::new();
        let mut writer = TagWriter::new(&mut out).unwrap();
        writer.open_tag("a", &[]).unwrap();
        writer.write_value("one").unwrap();
        let e = writer.write_value("two").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ApiUsage);
        writer.close().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), doc("<a>one</a>"));
    }

    #[test]
    fn child_after_value_rejected() {
        let mut out = Vec::new();
        let mut writer = TagWriter::new(&mut out).unwrap();
        writer.open_tag("a", &[]).unwrap();
        writer.write_value("one").unwrap();
        let e = writer.open_tag("b", &[]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ApiUsage);
        assert_eq!(writer.depth(), 1);
        writer.close().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), doc("<a>one</a>"));
    }

    #[test]
    fn close_closes_everything() {
        let mut out = Vec::new();
        let mut writer = TagWriter::new(&mut out).unwrap();
        writer.open_tag("a", &[]).unwrap();
        writer.open_tag("b", &[]).unwrap();
        writer.open_tag("c", &[]).unwrap();
        writer.write_value("x").unwrap();
        assert_eq!(writer.depth(), 3);
        writer.close().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            doc("<a>\n\t<b>\n\t\t<c>x</c>\n\t</b>\n</a>"),
        );
    }

    #[test]
    fn drop_closes_everything() {
        let mut out = Vec::new();
        {
            let mut writer = TagWriter::new(&mut out).unwrap();
            writer.open_tag("a", &[]).unwrap();
            writer.open_tag("b", &[]).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), doc("<a>\n\t<b />\n</a>"));
    }

    #[test]
    fn escaping_is_opt_in() {
        let out = written(|w| {
            w.open_tag("q", &["note", "a \"b\" <c>"])?;
            w.write_value("fish & chips")?;
            w.close_tag()
        });
        assert_eq!(out, doc("<q note=\"a \"b\" <c>\">fish & chips</q>"));

        let mut out = Vec::new();
        let mut writer = TagWriter::with_options(&mut out, WriterOptions::default().escape(true)).unwrap();
        writer.open_tag("q", &["note", "a \"b\" <c>"]).unwrap();
        writer.write_value("fish & \"chips\"").unwrap();
        writer.close().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            doc("<q note=\"a &quot;b&quot; &lt;c&gt;\">fish &amp; \"chips\"</q>"),
        );
    }

    fn contains(buf: &[u8], needle: &str) -> bool {
        buf.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    /// Sink which fails the first write containing a particular string,
    /// accepting none of it.
    struct FailOn {
        trigger: &'static str,
        failed: bool,
        out: Vec<u8>,
    }

    impl Write for FailOn {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.failed && contains(buf, self.trigger) {
                self.failed = true;
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.out.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_error_breaks_writer_but_teardown_closes_tags() {
        let sink = FailOn {
            trigger: "boom",
            failed: false,
            out: Vec::new(),
        };
        let mut writer = TagWriter::new(sink).unwrap();
        writer.open_tag("a", &[]).unwrap();
        writer.open_tag("b", &[]).unwrap();

        let e = writer.write_value("boom").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Io);
        assert!(writer.is_broken());

        let e = writer.open_tag("c", &[]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ApiUsage);
        let e = writer.close_tag().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ApiUsage);

        let sink = writer.close().unwrap();
        assert_eq!(
            String::from_utf8(sink.out).unwrap(),
            doc("<a>\n\t<b></b>\n</a>"),
        );
    }

    #[test]
    fn failed_child_tag_leaves_no_fragment() {
        let sink = FailOn {
            trigger: "child",
            failed: false,
            out: Vec::new(),
        };
        let mut writer = TagWriter::new(sink).unwrap();
        writer.open_tag("root", &[]).unwrap();
        let e = writer.open_tag("child", &["id", "1"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Io);
        assert_eq!(writer.depth(), 1);

        let sink = writer.close().unwrap();
        assert_eq!(String::from_utf8(sink.out).unwrap(), doc("<root>\n\t\n</root>"));
    }

    /// Sink which, on the first write containing a particular string, takes
    /// only `accept` bytes of it and then fails the following write.
    struct ShortOn {
        trigger: &'static str,
        accept: usize,
        stage: u8,
        out: Vec<u8>,
    }

    impl Write for ShortOn {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.stage {
                0 if contains(buf, self.trigger) => {
                    self.stage = 1;
                    let n = self.accept.min(buf.len());
                    self.out.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
                1 => {
                    self.stage = 2;
                    Err(io::Error::new(io::ErrorKind::Other, "disk full"))
                }
                _ => {
                    self.out.extend_from_slice(buf);
                    Ok(buf.len())
                }
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn half_written_tag_finished_by_teardown() {
        let sink = ShortOn {
            trigger: "child",
            accept: 3,
            stage: 0,
            out: Vec::new(),
        };
        let mut writer = TagWriter::new(sink).unwrap();
        writer.open_tag("root", &[]).unwrap();
        let e = writer.open_tag("child", &["id", "1"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Io);
        assert!(writer.is_broken());
        assert_eq!(writer.depth(), 2);
        assert!(format!("{:?}", writer).contains("unfinished: 10 bytes"));

        let sink = writer.close().unwrap();
        assert_eq!(
            String::from_utf8(sink.out).unwrap(),
            doc("<root>\n\t<child id=\"1\" />\n</root>"),
        );
    }

    #[test]
    fn half_written_end_tag_finished_by_teardown() {
        let sink = ShortOn {
            trigger: "</leaf>",
            accept: 4,
            stage: 0,
            out: Vec::new(),
        };
        let mut writer = TagWriter::new(sink).unwrap();
        writer.open_tag("root", &[]).unwrap();
        writer.open_tag("leaf", &[]).unwrap();
        writer.write_value("x").unwrap();
        let e = writer.close_tag().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Io);
        assert_eq!(writer.depth(), 1);

        let sink = writer.close().unwrap();
        assert_eq!(
            String::from_utf8(sink.out).unwrap(),
            doc("<root>\n\t<leaf>x</leaf>\n</root>"),
        );
    }

    #[test]
    fn options_kept() {
        let mut out = Vec::new();
        let writer = TagWriter::new(&mut out).unwrap();
        assert!(!writer.options().escape);
        drop(writer);

        let writer = TagWriter::with_options(&mut out, WriterOptions::default().escape(true)).unwrap();
        assert_eq!(writer.options(), &WriterOptions { escape: true });
    }

    #[test]
    fn debug_shows_open_elements() {
        let mut out = Vec::new();
        let mut writer = TagWriter::new(&mut out).unwrap();
        writer.open_tag("Array", &[]).unwrap();
        writer.open_tag("Person", &[]).unwrap();
        let dbg = format!("{:?}", writer);
        assert!(dbg.contains("00. <Array> Children"));
        assert!(dbg.contains("01. <Person> Fresh"));
    }
}
