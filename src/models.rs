use serde::Serialize;
use std::sync::Arc;

/// Header of a page, shared by every revision cut out of that page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub page_id: String,
    pub title: String,
    pub namespace: String,
    pub restrictions: Option<String>,
    /// Target title when the page is a redirect stub
    pub redirects_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contributor {
    Registered { username: String, user_id: String },
    Anonymous { ip: String },
}

/// One historical version of a page.
#[derive(Debug, Clone)]
pub struct Revision {
    pub page: Arc<Page>,
    pub revision_id: String,
    /// Absent on a page's first revision
    pub parent_revision_id: Option<String>,
    pub timestamp: String,
    pub contributor: Option<Contributor>,
    pub comment: Option<String>,
    pub minor: bool,
    pub sha1: String,
    pub content_model: String,
    pub content_format: String,
    pub raw_markup: String,
    /// Length asserted by the dump's `bytes` attribute, -1 when not declared
    pub declared_content_length: i64,
    pub is_redirect: bool,
    pub is_stub: bool,
    /// Non-zero declared length but an empty body: the text was suppressed upstream
    pub is_metadata_only: bool,
}

impl Revision {
    pub fn new(page: Arc<Page>) -> Self {
        Self {
            page,
            revision_id: String::new(),
            parent_revision_id: None,
            timestamp: String::new(),
            contributor: None,
            comment: None,
            minor: false,
            sha1: String::new(),
            content_model: String::new(),
            content_format: String::new(),
            raw_markup: String::new(),
            declared_content_length: -1,
            is_redirect: false,
            is_stub: false,
            is_metadata_only: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_markup.is_empty()
    }

    /// Byte length of the markup actually present in the dump.
    pub fn observed_content_length(&self) -> usize {
        self.raw_markup.len()
    }

    /// `"{page_id}_{revision_id}"`
    pub fn key(&self) -> String {
        format!("{}_{}", self.page.page_id, self.revision_id)
    }
}

/// A revision as handed to consumers, keyed by page and revision id.
#[derive(Debug, Clone)]
pub struct RevisionRecord {
    pub key: String,
    pub revision: Revision,
}

impl RevisionRecord {
    pub fn new(revision: Revision) -> Self {
        Self {
            key: revision.key(),
            revision,
        }
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.revision.page
    }
}

/// Flat metadata row written to the revision CSV shards and window output.
#[derive(Serialize)]
pub struct RevisionRow<'a> {
    pub key: &'a str,
    pub page_id: &'a str,
    pub title: &'a str,
    pub namespace: &'a str,
    pub redirects_to: Option<&'a str>,
    pub restrictions: Option<&'a str>,
    pub revision_id: &'a str,
    pub parent_revision_id: Option<&'a str>,
    pub timestamp: &'a str,
    pub username: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub ip: Option<&'a str>,
    pub comment: Option<&'a str>,
    pub minor: bool,
    pub sha1: &'a str,
    pub model: &'a str,
    pub format: &'a str,
    pub declared_length: i64,
    pub observed_length: usize,
    pub is_redirect: bool,
    pub is_stub: bool,
    pub is_metadata_only: bool,
}

impl<'a> From<&'a RevisionRecord> for RevisionRow<'a> {
    fn from(record: &'a RevisionRecord) -> Self {
        let rev = &record.revision;
        let page = &rev.page;
        let (username, user_id, ip) = match &rev.contributor {
            Some(Contributor::Registered { username, user_id }) => {
                (Some(username.as_str()), Some(user_id.as_str()), None)
            }
            Some(Contributor::Anonymous { ip }) => (None, None, Some(ip.as_str())),
            None => (None, None, None),
        };
        Self {
            key: &record.key,
            page_id: &page.page_id,
            title: &page.title,
            namespace: &page.namespace,
            redirects_to: page.redirects_to.as_deref(),
            restrictions: page.restrictions.as_deref(),
            revision_id: &rev.revision_id,
            parent_revision_id: rev.parent_revision_id.as_deref(),
            timestamp: &rev.timestamp,
            username,
            user_id,
            ip,
            comment: rev.comment.as_deref(),
            minor: rev.minor,
            sha1: &rev.sha1,
            model: &rev.content_model,
            format: &rev.content_format,
            declared_length: rev.declared_content_length,
            observed_length: rev.observed_content_length(),
            is_redirect: rev.is_redirect,
            is_stub: rev.is_stub,
            is_metadata_only: rev.is_metadata_only,
        }
    }
}

/// Revision body written to the optional JSONL text shards.
#[derive(Serialize)]
pub struct TextBlob<'a> {
    pub key: &'a str,
    pub title: &'a str,
    pub text: &'a str,
}
