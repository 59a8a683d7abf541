//! Markdown structure walker.
//!
//! Walks the pulldown-cmark event stream of a document body once and collects
//! the title, description, sections, images and claim declarations.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::iter::Peekable;
use std::path::{Path, PathBuf};

use mtc_formats::{ClaimLocalization, DisplayLocalization, ImageRef};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde_json::{Map, Value};

use crate::front_matter::extract_front_matter;
use crate::grammar::{ClaimDef, ParsedLine, parse_claim, parse_line};
use crate::ParseError;

/// Section name for text following the title heading.
pub const TITLE_SECTION: &str = "_title";

/// Structure extracted from one markdown document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedMarkdown {
    /// First level-1 heading.
    pub title: String,
    /// First paragraph after the title.
    pub description: String,
    /// Section heading -> paragraphs joined by blank lines.
    pub sections: BTreeMap<String, String>,
    /// Images in document order.
    pub images: Vec<ImageRef>,
    /// Claims in document order; names are unique.
    pub claims: Vec<ClaimDef>,
    /// Flat string values from front matter.
    pub metadata: BTreeMap<String, String>,
    /// Front matter `display` block.
    pub display: BTreeMap<String, DisplayLocalization>,
    /// Front matter `formats` block.
    pub formats: HashMap<String, Map<String, Value>>,
}

impl ParsedMarkdown {
    /// Look up a claim by name.
    pub fn claim(&self, name: &str) -> Option<&ClaimDef> {
        self.claims.iter().find(|claim| claim.name == name)
    }

    /// Insert a claim, replacing an earlier claim with the same name in place.
    fn upsert_claim(&mut self, claim: ClaimDef) {
        match self.claims.iter_mut().find(|c| c.name == claim.name) {
            Some(existing) => *existing = claim,
            None => self.claims.push(claim),
        }
    }
}

/// Markdown credential definition parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a markdown file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Io`] if the file cannot be read and
    /// [`ParseError::Walk`] if the markdown structure is malformed.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedMarkdown, ParseError> {
        tracing::debug!(path = %path.display(), "Parsing markdown");
        let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_content(&content, path)
    }

    /// Parse markdown content.
    ///
    /// `base_path` is the path of the document; relative image paths are
    /// resolved against its directory.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Walk`] if the markdown structure is malformed.
    pub fn parse_content(&self, content: &str, base_path: &Path) -> Result<ParsedMarkdown, ParseError> {
        let front_matter = extract_front_matter(content);
        let body = &content[front_matter.body_offset..];
        let base_dir = base_path.parent().unwrap_or_else(|| Path::new(""));

        let events = Parser::new_ext(body, Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
        let mut parsed = walk(events, base_dir)?;
        parsed.metadata = front_matter.metadata;
        parsed.display = front_matter.display;
        parsed.formats = front_matter.formats;
        Ok(parsed)
    }
}

/// Walk an event stream.
pub(crate) fn walk<'a>(
    events: impl Iterator<Item = Event<'a>>,
    base_dir: &Path,
) -> Result<ParsedMarkdown, ParseError> {
    Walker {
        events: events.peekable(),
        base_dir,
        out: ParsedMarkdown::default(),
        section: None,
        buffer: String::new(),
        description_taken: false,
        open: Vec::new(),
    }
    .run()
}

struct Walker<'p, I: Iterator> {
    events: Peekable<I>,
    base_dir: &'p Path,
    out: ParsedMarkdown,
    section: Option<String>,
    buffer: String,
    description_taken: bool,
    /// Container tags entered at the top level, innermost last.
    open: Vec<TagEnd>,
}

/// What to do with the next event while reading a tight list item's text.
enum ItemText {
    Paragraph,
    Inline,
    Done,
}

impl<'a, I> Walker<'_, I>
where
    I: Iterator<Item = Event<'a>>,
{
    fn run(mut self) -> Result<ParsedMarkdown, ParseError> {
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => self.heading(level)?,
                Event::Start(Tag::Paragraph) => self.paragraph()?,
                Event::Start(tag @ Tag::List(_)) => self.claim_list(tag.to_end())?,
                Event::Start(Tag::Image { dest_url, .. }) => self.image(dest_url.into_string())?,
                Event::Start(tag @ Tag::MetadataBlock(_)) => self.skip(tag.to_end())?,
                Event::Start(tag) => self.open.push(tag.to_end()),
                Event::End(end) => match self.open.pop() {
                    Some(expected) if expected == end => {}
                    Some(expected) => return Err(mismatch(expected, end)),
                    None => {
                        return Err(ParseError::Walk(format!("unexpected end tag {end:?}")));
                    }
                },
                _ => {}
            }
        }

        if let Some(unclosed) = self.open.last() {
            return Err(ParseError::Walk(format!("unclosed tag {unclosed:?}")));
        }
        self.flush_section();
        Ok(self.out)
    }

    fn next_event(&mut self, inside: TagEnd) -> Result<Event<'a>, ParseError> {
        self.events
            .next()
            .ok_or_else(|| ParseError::Walk(format!("unexpected end of document inside {inside:?}")))
    }

    fn heading(&mut self, level: HeadingLevel) -> Result<(), ParseError> {
        let text = self.inline_text(TagEnd::Heading(level))?;
        self.flush_section();

        if level == HeadingLevel::H1 && self.out.title.is_empty() {
            self.out.title = text;
            self.section = Some(TITLE_SECTION.to_owned());
        } else {
            self.section = Some(text);
        }
        Ok(())
    }

    fn paragraph(&mut self) -> Result<(), ParseError> {
        let text = self.inline_text(TagEnd::Paragraph)?;
        if text.is_empty() {
            return Ok(());
        }

        if self.section.as_deref() == Some(TITLE_SECTION) && !self.description_taken {
            self.out.description = text;
            self.description_taken = true;
        } else if self.section.is_some() {
            if !self.buffer.is_empty() {
                self.buffer.push_str("\n\n");
            }
            self.buffer.push_str(&text);
        }
        Ok(())
    }

    fn flush_section(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        let text = text.trim();
        if let Some(name) = &self.section
            && !text.is_empty()
        {
            self.out.sections.insert(name.clone(), text.to_owned());
        }
    }

    fn image(&mut self, dest: String) -> Result<(), ParseError> {
        let alt_text = self.inline_text(TagEnd::Image)?;
        let absolute_path = self.resolve_path(&dest);
        self.out.images.push(ImageRef {
            path: dest,
            alt_text,
            absolute_path,
        });
        Ok(())
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() || path.starts_with("http") || path.starts_with("data:") {
            candidate.to_path_buf()
        } else {
            self.base_dir.join(candidate)
        }
    }

    /// Concatenate inline text up to `end`.
    ///
    /// Inline code keeps its backticks, line breaks become one space, nested
    /// images are recorded but do not contribute text.
    fn inline_text(&mut self, end: TagEnd) -> Result<String, ParseError> {
        let mut text = String::new();
        let mut nested: Vec<TagEnd> = Vec::new();

        loop {
            match self.next_event(end)? {
                Event::End(found) => match nested.pop() {
                    Some(expected) if expected == found => {}
                    Some(expected) => return Err(mismatch(expected, found)),
                    None if found == end => break,
                    None => return Err(mismatch(end, found)),
                },
                Event::Start(Tag::Image { dest_url, .. }) => self.image(dest_url.into_string())?,
                Event::Start(tag) => nested.push(tag.to_end()),
                Event::Text(t) => text.push_str(&t),
                Event::Code(code) => {
                    text.push('`');
                    text.push_str(&code);
                    text.push('`');
                }
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                _ => {}
            }
        }

        Ok(text.trim().to_owned())
    }

    /// Consume events up to and including `end`, recording images.
    fn skip(&mut self, end: TagEnd) -> Result<(), ParseError> {
        let mut open = vec![end];
        while let Some(expected) = open.last().copied() {
            match self.next_event(expected)? {
                Event::Start(Tag::Image { dest_url, .. }) => self.image(dest_url.into_string())?,
                Event::Start(tag) => open.push(tag.to_end()),
                Event::End(found) if found == expected => {
                    open.pop();
                }
                Event::End(found) => return Err(mismatch(expected, found)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Text of a list item's first block, without consuming what follows it.
    fn item_text(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();
        loop {
            let action = match self.events.peek() {
                Some(Event::Start(Tag::Paragraph)) if text.is_empty() => ItemText::Paragraph,
                Some(Event::Start(tag)) if !is_inline(tag) => ItemText::Done,
                Some(Event::End(_)) => ItemText::Done,
                Some(_) => ItemText::Inline,
                None => return Err(ParseError::Walk("unexpected end of document inside list item".to_owned())),
            };

            match action {
                ItemText::Paragraph => {
                    self.events.next();
                    return self.inline_text(TagEnd::Paragraph);
                }
                ItemText::Done => break,
                ItemText::Inline => match self.next_event(TagEnd::Item)? {
                    Event::Start(Tag::Image { dest_url, .. }) => {
                        self.image(dest_url.into_string())?;
                    }
                    Event::Start(tag) => {
                        let inner = self.inline_text(tag.to_end())?;
                        text.push_str(&inner);
                    }
                    Event::Text(t) => text.push_str(&t),
                    Event::Code(code) => {
                        text.push('`');
                        text.push_str(&code);
                        text.push('`');
                    }
                    Event::SoftBreak | Event::HardBreak => text.push(' '),
                    _ => {}
                },
            }
        }
        Ok(text.trim().to_owned())
    }

    /// Walk a top-level list, parsing each item as a claim declaration.
    fn claim_list(&mut self, end: TagEnd) -> Result<(), ParseError> {
        loop {
            match self.next_event(end)? {
                Event::Start(Tag::Item) => self.claim_item()?,
                Event::Start(tag) => self.skip(tag.to_end())?,
                Event::End(found) if found == end => return Ok(()),
                Event::End(found) => return Err(mismatch(end, found)),
                _ => {}
            }
        }
    }

    fn claim_item(&mut self) -> Result<(), ParseError> {
        let text = self.item_text()?;
        let mut claim = parse_claim(&text);

        loop {
            match self.next_event(TagEnd::Item)? {
                Event::End(TagEnd::Item) => break,
                Event::Start(tag @ Tag::List(_)) => self.locale_list(tag.to_end(), claim.as_mut())?,
                Event::Start(Tag::Image { dest_url, .. }) => self.image(dest_url.into_string())?,
                Event::Start(tag) => self.skip(tag.to_end())?,
                Event::End(found) => return Err(mismatch(TagEnd::Item, found)),
                _ => {}
            }
        }

        if let Some(claim) = claim {
            self.out.upsert_claim(claim);
        }
        Ok(())
    }

    /// Walk a list nested in a claim item, parsing items as locale overrides.
    fn locale_list(&mut self, end: TagEnd, mut claim: Option<&mut ClaimDef>) -> Result<(), ParseError> {
        loop {
            match self.next_event(end)? {
                Event::Start(Tag::Item) => {
                    let text = self.item_text()?;
                    self.skip(TagEnd::Item)?;
                    if let Some(claim) = claim.as_deref_mut()
                        && let ParsedLine::Locale(locale) = parse_line(&text, true)
                    {
                        claim.localizations.insert(
                            locale.locale,
                            ClaimLocalization {
                                label: locale.label,
                                description: locale.description,
                            },
                        );
                    }
                }
                Event::Start(tag) => self.skip(tag.to_end())?,
                Event::End(found) if found == end => return Ok(()),
                Event::End(found) => return Err(mismatch(end, found)),
                _ => {}
            }
        }
    }
}

fn is_inline(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Emphasis
            | Tag::Strong
            | Tag::Strikethrough
            | Tag::Link { .. }
            | Tag::Image { .. }
    )
}

fn mismatch(expected: TagEnd, found: TagEnd) -> ParseError {
    ParseError::Walk(format!("expected end of {expected:?}, found {found:?}"))
}
