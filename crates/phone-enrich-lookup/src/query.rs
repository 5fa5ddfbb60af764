//! Search queries and their URLs.

use phone_enrich_match::normalize::{normalize_text, state_name};
use phone_enrich_match::{NameOrder, PersonName};
use url::Url;

use crate::LookupError;

/// One people-search query: a person's first/last name in a city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub first: String,
    pub last: String,
    pub middle_initial: Option<char>,
    pub city: String,
    pub state: String,
}

impl LookupQuery {
    /// Build a query from a raw record name (county `LAST FIRST M` order by
    /// default).
    pub fn from_record(name: &str, city: &str, state: &str, order: NameOrder) -> Self {
        let parsed = PersonName::parse(name, order);
        Self {
            first: parsed.first.clone(),
            last: parsed.last.clone(),
            middle_initial: parsed.middle_initial(),
            city: city.trim().to_string(),
            state: state.trim().to_string(),
        }
    }

    /// The searches run for one identity: plain `first+last` first, then the
    /// middle-initial search when the name has an initial. People listed
    /// without their initial only show up in the first one.
    pub fn variants(&self) -> Vec<LookupQuery> {
        let basic = LookupQuery {
            middle_initial: None,
            ..self.clone()
        };
        if self.middle_initial.is_some() {
            vec![basic, self.clone()]
        } else {
            vec![basic]
        }
    }

    /// Reject queries the service cannot answer.
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.first.trim().is_empty() || self.last.trim().is_empty() {
            return Err(LookupError::permanent(format!(
                "query needs a first and last name (got first={:?}, last={:?})",
                self.first, self.last
            )));
        }
        if self.city.trim().is_empty() || self.state.trim().is_empty() {
            return Err(LookupError::permanent("query needs a city and state"));
        }
        Ok(())
    }

    /// `{base}/people/{first}+{last}/{state-name}/{city}[?middle_name=M]`
    pub fn url(&self, base: &Url) -> Result<Url, LookupError> {
        self.validate()?;
        let who = normalize_text(&format!("{} {}", self.first, self.last)).replace(' ', "+");
        let state = state_name(&self.state)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_text(&self.state));
        let state = state.replace(' ', "-");
        let city = normalize_text(&self.city).replace(' ', "-");

        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::permanent(format!("base url cannot hold a path: {base}")))?
            .pop_if_empty()
            .extend(["people", who.as_str(), state.as_str(), city.as_str()]);
        if let Some(initial) = self.middle_initial {
            url.query_pairs_mut()
                .append_pair("middle_name", &initial.to_string());
        }
        Ok(url)
    }
}
