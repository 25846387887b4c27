use time::OffsetDateTime;

use crate::humanize::diff_for_humans;

const SHORT_DESCRIPTION_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheeseListing {
    pub id: i64,
    pub title: String,
    /// Stored HTML, see [`text_to_html`].
    pub description: String,
    /// Price in cents.
    pub price: i64,
    pub created_at: OffsetDateTime,
    pub is_published: bool,
    pub owner_id: i64,
}

impl CheeseListing {
    pub fn short_description(&self) -> String {
        short_description(&self.description)
    }

    pub fn created_at_ago(&self, now: OffsetDateTime) -> String {
        diff_for_humans(self.created_at, now)
    }

    pub fn iri(&self) -> String {
        cheese_iri(self.id)
    }
}

pub fn cheese_iri(id: i64) -> String {
    format!("/api/cheeses/{id}")
}

/// Values for a listing that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewCheeseListing {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub created_at: OffsetDateTime,
    pub is_published: bool,
    pub owner_id: i64,
}

impl NewCheeseListing {
    /// `created_at` is fixed here and never changes afterwards.
    pub fn new(title: String, raw_description: &str, price: i64, owner_id: i64) -> Self {
        Self {
            title,
            description: text_to_html(raw_description),
            price,
            created_at: OffsetDateTime::now_utc(),
            is_published: false,
            owner_id,
        }
    }
}

pub fn short_description(description: &str) -> String {
    if description.chars().count() < SHORT_DESCRIPTION_LEN {
        return description.to_string();
    }
    let cut = description
        .char_indices()
        .nth(SHORT_DESCRIPTION_LEN)
        .map_or(description.len(), |(i, _)| i);
    format!("{}...", &description[..cut])
}

/// Inserts `<br />` before each line break, keeping the break.
pub fn text_to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => {
                out.push_str("<br />");
                out.push(c);
                let pair = if c == '\r' { '\n' } else { '\r' };
                if chars.peek() == Some(&pair) {
                    out.push(pair);
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}
