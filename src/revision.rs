//! Revision extraction and content classification.

use crate::error::SnippetError;
use crate::models::{Contributor, Page, Revision};
use crate::snippet::{self, Element};
use std::sync::Arc;

const REDIRECT_MARKER: &str = "#REDIRECT";
const STUB_MARKER: &[u8] = b"stub}}";

/// Child elements of `<revision>` that carry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevisionField {
    Id,
    ParentId,
    Timestamp,
    Contributor,
    Minor,
    Comment,
    Text,
    Sha1,
    Model,
    Format,
}

impl RevisionField {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "id" => Some(Self::Id),
            "parentid" => Some(Self::ParentId),
            "timestamp" => Some(Self::Timestamp),
            "contributor" => Some(Self::Contributor),
            "minor" => Some(Self::Minor),
            "comment" => Some(Self::Comment),
            "text" => Some(Self::Text),
            "sha1" => Some(Self::Sha1),
            "model" => Some(Self::Model),
            "format" => Some(Self::Format),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContributorField {
    Username,
    Id,
    Ip,
}

impl ContributorField {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "username" => Some(Self::Username),
            "id" => Some(Self::Id),
            "ip" => Some(Self::Ip),
            _ => None,
        }
    }
}

/// Parses a `<revision>...</revision>` snippet belonging to `page`.
pub fn parse_revision(xml: &str, page: Arc<Page>) -> Result<Revision, SnippetError> {
    let root = snippet::parse(xml)?;
    let mut revision = Revision::new(page);

    for child in root.children {
        match RevisionField::from_tag(&child.name) {
            Some(RevisionField::Id) => revision.revision_id = child.text,
            Some(RevisionField::ParentId) => revision.parent_revision_id = Some(child.text),
            Some(RevisionField::Timestamp) => revision.timestamp = child.text,
            Some(RevisionField::Contributor) => revision.contributor = parse_contributor(&child),
            // presence of the empty <minor/> element marks a minor edit
            Some(RevisionField::Minor) => revision.minor = true,
            Some(RevisionField::Comment) => revision.comment = Some(child.text),
            Some(RevisionField::Text) => apply_text(&mut revision, child)?,
            Some(RevisionField::Sha1) => revision.sha1 = child.text,
            Some(RevisionField::Model) => revision.content_model = child.text,
            Some(RevisionField::Format) => revision.content_format = child.text,
            None => {}
        }
    }

    Ok(revision)
}

/// Either `{username, id}` or `{ip}`; nothing for a suppressed contributor.
fn parse_contributor(element: &Element) -> Option<Contributor> {
    let mut username = None;
    let mut user_id = None;
    let mut ip = None;

    for child in &element.children {
        match ContributorField::from_tag(&child.name) {
            Some(ContributorField::Username) => username = Some(child.text.clone()),
            Some(ContributorField::Id) => user_id = Some(child.text.clone()),
            Some(ContributorField::Ip) => ip = Some(child.text.clone()),
            None => {}
        }
    }

    match (ip, username, user_id) {
        (Some(ip), _, _) => Some(Contributor::Anonymous { ip }),
        (None, None, None) => None,
        (None, username, user_id) => Some(Contributor::Registered {
            username: username.unwrap_or_default(),
            user_id: user_id.unwrap_or_default(),
        }),
    }
}

fn apply_text(revision: &mut Revision, element: Element) -> Result<(), SnippetError> {
    if let Some(bytes) = element.attribute("bytes") {
        revision.declared_content_length = bytes
            .trim()
            .parse()
            .map_err(|_| SnippetError::InvalidContentLength(bytes.to_string()))?;
    }
    revision.raw_markup = element.text;
    classify(revision);
    Ok(())
}

/// Sets the flags derived from the body and its declared length.
fn classify(revision: &mut Revision) {
    let markup = &revision.raw_markup;
    revision.is_redirect = markup
        .get(..REDIRECT_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(REDIRECT_MARKER));
    revision.is_stub = memchr::memmem::find(markup.as_bytes(), STUB_MARKER).is_some();
    revision.is_metadata_only = revision.declared_content_length > 0 && markup.is_empty();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Arc<Page> {
        Arc::new(Page {
            page_id: "10".to_string(),
            title: "AccessibleComputing".to_string(),
            namespace: "0".to_string(),
            ..Page::default()
        })
    }

    const REGISTERED: &str = r#"<revision>
      <id>862220</id>
      <parentid>233192</parentid>
      <timestamp>2002-02-25T15:43:11Z</timestamp>
      <contributor>
        <username>Conversion script</username>
        <id>0</id>
      </contributor>
      <minor />
      <comment>Automated conversion</comment>
      <model>wikitext</model>
      <format>text/x-wiki</format>
      <text xml:space="preserve" bytes="35">#REDIRECT [[Accessible Computing]]</text>
      <sha1>i8pwco22fwt12yp12x29wc065ded2bh</sha1>
    </revision>"#;

    #[test]
    fn parses_registered_revision() {
        let rev = parse_revision(REGISTERED, page()).unwrap();
        assert_eq!(rev.revision_id, "862220");
        assert_eq!(rev.parent_revision_id.as_deref(), Some("233192"));
        assert_eq!(rev.timestamp, "2002-02-25T15:43:11Z");
        assert_eq!(
            rev.contributor,
            Some(Contributor::Registered {
                username: "Conversion script".to_string(),
                user_id: "0".to_string(),
            })
        );
        assert!(rev.minor);
        assert_eq!(rev.comment.as_deref(), Some("Automated conversion"));
        assert_eq!(rev.content_model, "wikitext");
        assert_eq!(rev.content_format, "text/x-wiki");
        assert_eq!(rev.sha1, "i8pwco22fwt12yp12x29wc065ded2bh");
        assert_eq!(rev.raw_markup, "#REDIRECT [[Accessible Computing]]");
        assert_eq!(rev.declared_content_length, 35);
        assert!(rev.is_redirect);
        assert!(!rev.is_stub);
        assert!(!rev.is_metadata_only);
        assert_eq!(rev.key(), "10_862220");
    }

    #[test]
    fn parses_anonymous_contributor() {
        let rev = parse_revision(
            "<revision><id>19746</id><contributor><ip>140.232.153.45</ip></contributor></revision>",
            page(),
        )
        .unwrap();
        assert_eq!(
            rev.contributor,
            Some(Contributor::Anonymous {
                ip: "140.232.153.45".to_string()
            })
        );
        assert!(!rev.minor);
    }

    #[test]
    fn suppressed_contributor_is_none() {
        let rev = parse_revision(
            r#"<revision><id>1</id><contributor deleted="deleted" /></revision>"#,
            page(),
        )
        .unwrap();
        assert_eq!(rev.contributor, None);
    }

    #[test]
    fn empty_body_with_declared_length_is_metadata_only() {
        let rev = parse_revision(
            r#"<revision><id>233192</id><text xml:space="preserve" bytes="124" /></revision>"#,
            page(),
        )
        .unwrap();
        assert!(rev.is_metadata_only);
        assert_eq!(rev.declared_content_length, 124);
        assert_eq!(rev.raw_markup, "");
        assert!(rev.is_empty());
    }

    #[test]
    fn zero_declared_length_is_not_metadata_only() {
        let rev = parse_revision(r#"<revision><text bytes="0"></text></revision>"#, page()).unwrap();
        assert_eq!(rev.declared_content_length, 0);
        assert!(!rev.is_metadata_only);
    }

    #[test]
    fn missing_fields_default() {
        let rev = parse_revision("<revision><comment>*</comment></revision>", page()).unwrap();
        assert_eq!(rev.revision_id, "");
        assert_eq!(rev.timestamp, "");
        assert_eq!(rev.parent_revision_id, None);
        assert_eq!(rev.declared_content_length, -1);
        assert_eq!(rev.contributor, None);
        assert!(!rev.is_metadata_only);
    }

    #[test]
    fn redirect_marker_is_case_insensitive() {
        let rev = parse_revision("<revision><text>#Redirect [[Elsewhere]]</text></revision>", page()).unwrap();
        assert!(rev.is_redirect);
        let rev = parse_revision("<revision><text>See #REDIRECT</text></revision>", page()).unwrap();
        assert!(!rev.is_redirect);
    }

    #[test]
    fn short_or_multibyte_body_is_not_a_redirect() {
        let rev = parse_revision("<revision><text>#RED</text></revision>", page()).unwrap();
        assert!(!rev.is_redirect);
        let rev = parse_revision("<revision><text>#REDIRECé</text></revision>", page()).unwrap();
        assert!(!rev.is_redirect);
    }

    #[test]
    fn detects_stub_template() {
        let rev = parse_revision(
            "<revision><text>Tiny article.\n{{physics-stub}}</text></revision>",
            page(),
        )
        .unwrap();
        assert!(rev.is_stub);
    }

    #[test]
    fn non_numeric_length_is_an_error() {
        let result = parse_revision(r#"<revision><text bytes="lots">x</text></revision>"#, page());
        assert!(matches!(result, Err(SnippetError::InvalidContentLength(v)) if v == "lots"));
    }

    #[test]
    fn shares_the_given_page() {
        let shared = page();
        let a = parse_revision("<revision><id>1</id></revision>", Arc::clone(&shared)).unwrap();
        let b = parse_revision("<revision><id>2</id></revision>", Arc::clone(&shared)).unwrap();
        assert!(Arc::ptr_eq(&a.page, &b.page));
    }
}
