use std::fmt::{Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use crate::{
    error::Error, form, models::rules::SubredditRules, result::Result, Client,
};

/// The kind of item a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Submissions only. The wire literal is `link`.
    Link,
    /// Comments only.
    Comment,
    /// Submissions and comments.
    All,
}

impl RuleKind {
    /// Returns the literal the API accepts for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Link => "link",
            RuleKind::Comment => "comment",
            RuleKind::All => "all",
        }
    }

    /// Parses a wire literal. `submission` is accepted as an alias of
    /// `link`, matching the listing endpoint's older vocabulary.
    pub fn parse(literal: &str) -> Option<RuleKind> {
        match literal {
            "link" | "submission" => Some(RuleKind::Link),
            "comment" => Some(RuleKind::Comment),
            "all" => Some(RuleKind::All),
            _ => None,
        }
    }
}

impl Display for RuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully-populated rule record as reported by the server.
///
/// The record keeps every field the server sent as a name-to-value mapping,
/// so unknown fields survive a fetch unchanged; the typed accessors read
/// through the mapping. Fields the server omitted read as their empty
/// values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleData {
    fields: Map<String, Value>,
}

impl RuleData {
    fn str_field(&self, name: &str) -> &str {
        self.fields.get(name).and_then(Value::as_str).unwrap_or("")
    }

    /// Returns the name of the rule.
    pub fn short_name(&self) -> &str {
        self.str_field("short_name")
    }

    /// Returns the description of the rule, blank if none was provided.
    pub fn description(&self) -> &str {
        self.str_field("description")
    }

    /// Returns the reason displayed on the report menu for the rule.
    pub fn violation_reason(&self) -> &str {
        self.str_field("violation_reason")
    }

    /// Returns the kind of item the rule applies to.
    ///
    /// Unrecognized literals read as [`RuleKind::All`].
    pub fn kind(&self) -> RuleKind {
        RuleKind::parse(self.str_field("kind")).unwrap_or(RuleKind::All)
    }

    /// Returns the zero-based rank of the rule within its subreddit.
    pub fn priority(&self) -> u64 {
        self.fields
            .get("priority")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Returns the creation time of the rule, if the server reported one.
    #[allow(clippy::cast_possible_truncation)]
    pub fn created_utc(&self) -> Option<DateTime<Utc>> {
        let epoch = self.fields.get("created_utc")?.as_f64()?;
        Utc.timestamp_opt(epoch.trunc() as i64, 0).single()
    }

    /// Returns a raw server field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A single subreddit rule, fetched lazily.
///
/// A `Rule` is constructed either from a full [`RuleData`] record, in which
/// case it is fetched from the start, or from a name alone, in which case
/// the first attribute access scans the owning listing exactly once and
/// populates the record. Clones share the fetch state, so a family of
/// clones also fetches at most once.
#[derive(Debug, Clone)]
pub struct Rule {
    short_name: String,
    rules: Option<SubredditRules>,
    data: Arc<OnceCell<RuleData>>,
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.short_name == other.short_name
    }
}

impl Rule {
    /// Constructs a rule from exactly one of `short_name` or `data`.
    ///
    /// `rules` is the owning listing; it may be `None` for instances built
    /// from deserialized data whose owner is not known yet, in which case
    /// [`Rule::attach`] must be called before any operation that talks to
    /// the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousInit`] if both or neither of `short_name`
    /// and `data` are given.
    pub fn new(
        rules: Option<SubredditRules>,
        short_name: Option<String>,
        data: Option<RuleData>,
    ) -> Result<Rule> {
        match (short_name, data) {
            (Some(short_name), None) => Ok(Rule {
                short_name,
                rules,
                data: Arc::new(OnceCell::new()),
            }),
            (None, Some(data)) => Ok(Rule {
                short_name: data.short_name().to_string(),
                rules,
                data: Arc::new(OnceCell::new_with(Some(data))),
            }),
            _ => Err(Error::AmbiguousInit),
        }
    }

    pub(crate) fn stub(rules: &SubredditRules, short_name: &str) -> Rule {
        Rule {
            short_name: short_name.to_string(),
            rules: Some(rules.clone()),
            data: Arc::new(OnceCell::new()),
        }
    }

    pub(crate) fn fetched(rules: &SubredditRules, data: RuleData) -> Rule {
        Rule {
            short_name: data.short_name().to_string(),
            rules: Some(rules.clone()),
            data: Arc::new(OnceCell::new_with(Some(data))),
        }
    }

    /// Returns the name of the rule. Never triggers a fetch.
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Returns true once the full record has been populated.
    pub fn is_fetched(&self) -> bool {
        self.data.get().is_some()
    }

    /// Attaches the owning listing to a detached instance.
    pub fn attach(&mut self, rules: &SubredditRules) {
        self.rules = Some(rules.clone());
    }

    fn owner(&self) -> Result<&SubredditRules> {
        self.rules
            .as_ref()
            .ok_or_else(|| Error::DetachedRule(self.short_name.clone()))
    }

    /// Returns the full record, fetching it on first access.
    ///
    /// The fetch scans the owning listing for an entry whose name matches
    /// exactly. Concurrent first accesses share a single fetch.
    ///
    /// # Errors
    ///
    /// [`Error::DetachedRule`] if no listing is attached,
    /// [`Error::RuleNotFound`] if the listing has no rule with this name,
    /// or any error from fetching the listing itself.
    pub async fn data(&self, client: &Client) -> Result<&RuleData> {
        self.data
            .get_or_try_init(|| async {
                let rules = self.owner()?;
                let entries = rules.entries(client).await?;
                entries
                    .iter()
                    .find(|entry| entry.short_name() == self.short_name)
                    .cloned()
                    .ok_or_else(|| Error::RuleNotFound {
                        subreddit: rules.subreddit().to_string(),
                        short_name: self.short_name.clone(),
                    })
            })
            .await
    }

    /// Returns the description of the rule, fetching on first access.
    ///
    /// # Errors
    ///
    /// See [`Rule::data`].
    pub async fn description(&self, client: &Client) -> Result<&str> {
        Ok(self.data(client).await?.description())
    }

    /// Returns the kind of the rule, fetching on first access.
    ///
    /// # Errors
    ///
    /// See [`Rule::data`].
    pub async fn kind(&self, client: &Client) -> Result<RuleKind> {
        Ok(self.data(client).await?.kind())
    }

    /// Returns the rank of the rule, fetching on first access.
    ///
    /// # Errors
    ///
    /// See [`Rule::data`].
    pub async fn priority(&self, client: &Client) -> Result<u64> {
        Ok(self.data(client).await?.priority())
    }

    /// Returns the report-menu reason of the rule, fetching on first access.
    ///
    /// # Errors
    ///
    /// See [`Rule::data`].
    pub async fn violation_reason(&self, client: &Client) -> Result<&str> {
        Ok(self.data(client).await?.violation_reason())
    }

    /// Returns the creation time of the rule, fetching on first access.
    ///
    /// # Errors
    ///
    /// See [`Rule::data`].
    pub async fn created_utc(&self, client: &Client) -> Result<Option<DateTime<Utc>>> {
        Ok(self.data(client).await?.created_utc())
    }

    /// Deletes the rule from its subreddit.
    ///
    /// The owning listing's cache is invalidated on success, so the next
    /// read re-fetches.
    ///
    /// # Errors
    ///
    /// [`Error::DetachedRule`] if no listing is attached, or any transport
    /// or API error from the remove endpoint.
    pub async fn delete(&self, client: &Client) -> Result<()> {
        let rules = self.owner()?;
        let body = form::pairs(&[
            ("api_type", "json"),
            ("r", rules.subreddit()),
            ("short_name", &self.short_name),
        ]);
        client.post_api("api/remove_subreddit_rule", body).await?;
        log::info!("deleted rule {} from r/{}", self, rules.subreddit());
        rules.invalidate().await;
        Ok(())
    }

    /// Updates the rule, returning the server's authoritative result as a
    /// new instance. `self` is left unchanged.
    ///
    /// Fields omitted from `patch` keep their current values; reading those
    /// may itself trigger the lazy fetch. Renaming through
    /// [`RulePatch::short_name`] is supported: the update is addressed by
    /// the old name and the returned rule carries the new one.
    ///
    /// The owning listing's cache is invalidated on success.
    ///
    /// # Errors
    ///
    /// [`Error::DetachedRule`] if no listing is attached, or any transport
    /// or API error from the update endpoint.
    pub async fn update(&self, client: &Client, patch: RulePatch) -> Result<Rule> {
        let rules = self.owner()?.clone();
        let description = match patch.description {
            Some(description) => description,
            None => self.description(client).await?.to_string(),
        };
        let kind = match patch.kind {
            Some(kind) => kind,
            None => self.kind(client).await?,
        };
        let short_name = match patch.short_name {
            Some(short_name) => short_name,
            None => self.short_name.clone(),
        };
        let violation_reason = match patch.violation_reason {
            Some(violation_reason) => violation_reason,
            None => self.violation_reason(client).await?.to_string(),
        };

        let body = form::pairs(&[
            ("api_type", "json"),
            ("r", rules.subreddit()),
            ("old_short_name", &self.short_name),
            ("short_name", &short_name),
            ("kind", kind.as_str()),
            ("description", &description),
            ("violation_reason", &violation_reason),
        ]);
        let data = client
            .post_api("api/update_subreddit_rule", body)
            .await?
            .into_rule()?;
        log::info!("updated rule {} in r/{}", self, rules.subreddit());
        rules.invalidate().await;
        Ok(Rule::fetched(&rules, data))
    }
}

/// New values for [`Rule::update`]. Unset fields keep their current values.
#[derive(Debug, Clone, Default)]
pub struct RulePatch {
    pub(crate) description: Option<String>,
    pub(crate) kind: Option<RuleKind>,
    pub(crate) short_name: Option<String>,
    pub(crate) violation_reason: Option<String>,
}

impl RulePatch {
    /// Creates an empty patch. Applying it updates nothing.
    pub fn new() -> RulePatch {
        RulePatch::default()
    }

    /// Sets a new description. May be empty.
    pub fn description(mut self, description: &str) -> RulePatch {
        self.description = Some(description.to_string());
        self
    }

    /// Sets a new kind.
    pub fn kind(mut self, kind: RuleKind) -> RulePatch {
        self.kind = Some(kind);
        self
    }

    /// Renames the rule.
    pub fn short_name(mut self, short_name: &str) -> RulePatch {
        self.short_name = Some(short_name.to_string());
        self
    }

    /// Sets a new report-menu reason.
    pub fn violation_reason(mut self, violation_reason: &str) -> RulePatch {
        self.violation_reason = Some(violation_reason.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Rule, RuleData, RuleKind};
    use crate::error::Error;

    fn data(value: serde_json::Value) -> RuleData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn kind_literals_round_trip() {
        for kind in [RuleKind::Link, RuleKind::Comment, RuleKind::All] {
            assert_eq!(RuleKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RuleKind::parse("submission"), Some(RuleKind::Link));
        assert_eq!(RuleKind::parse("modmail"), None);
    }

    #[test]
    fn record_reads_through_the_field_mapping() {
        let data = data(serde_json::json!({
            "short_name": "No spam",
            "kind": "link",
            "description": "Do not spam.",
            "violation_reason": "Spam",
            "priority": 2,
            "created_utc": 1_595_848_561.0,
            "description_html": "<p>Do not spam.</p>",
        }));
        assert_eq!(data.short_name(), "No spam");
        assert_eq!(data.kind(), RuleKind::Link);
        assert_eq!(data.description(), "Do not spam.");
        assert_eq!(data.violation_reason(), "Spam");
        assert_eq!(data.priority(), 2);
        assert_eq!(
            data.created_utc().unwrap().timestamp(),
            1_595_848_561
        );
        // fields this library does not model stay reachable
        assert!(data.get("description_html").is_some());
    }

    #[test]
    fn omitted_fields_read_as_empty_values() {
        let data = data(serde_json::json!({ "short_name": "Bare" }));
        assert_eq!(data.description(), "");
        assert_eq!(data.violation_reason(), "");
        assert_eq!(data.priority(), 0);
        assert_eq!(data.kind(), RuleKind::All);
        assert!(data.created_utc().is_none());
    }

    #[test]
    fn construction_needs_exactly_one_identity() {
        let record = data(serde_json::json!({ "short_name": "No spam" }));

        assert!(matches!(
            Rule::new(None, None, None),
            Err(Error::AmbiguousInit)
        ));
        assert!(matches!(
            Rule::new(None, Some("No spam".to_string()), Some(record.clone())),
            Err(Error::AmbiguousInit)
        ));

        let stub = Rule::new(None, Some("No spam".to_string()), None).unwrap();
        assert!(!stub.is_fetched());
        assert_eq!(stub.short_name(), "No spam");

        let full = Rule::new(None, None, Some(record)).unwrap();
        assert!(full.is_fetched());
        assert_eq!(full.short_name(), "No spam");
    }

    #[tokio::test]
    async fn detached_rule_fails_fast() {
        let client = crate::Client::new();
        let stub = Rule::new(None, Some("No spam".to_string()), None).unwrap();
        assert!(matches!(
            stub.data(&client).await,
            Err(Error::DetachedRule(name)) if name == "No spam"
        ));
    }
}
