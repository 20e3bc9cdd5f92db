use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::Error,
    form,
    models::{
        rule::{Rule, RuleData, RuleKind},
        RulesPage,
    },
    result::Result,
    Client,
};

/// The ordered rule listing of one subreddit.
///
/// The listing is fetched once, on the first read (positional lookup or
/// iteration), and cached for the lifetime of the handle. Handles are cheap
/// to clone and share the cache. Every successful mutation through this
/// handle (`add`, `reorder`, and [`Rule::delete`] / [`Rule::update`] on
/// attached rules) invalidates the cache, so the next read observes the
/// write. Changes made elsewhere are only observed after
/// [`SubredditRules::invalidate`].
#[derive(Debug, Clone)]
pub struct SubredditRules {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    subreddit: String,
    cache: Mutex<Option<Arc<Vec<RuleData>>>>,
}

/// Argument to [`SubredditRules::get`]: a rule name or a position.
#[derive(Debug, Clone, Copy)]
pub enum RuleLookup<'a> {
    /// Lookup by rule name. Yields a stub; no request happens.
    Name(&'a str),
    /// Lookup by position; negative values count from the end of the
    /// listing. Materializes the cached listing.
    Index(isize),
}

impl<'a> From<&'a str> for RuleLookup<'a> {
    fn from(name: &'a str) -> Self {
        RuleLookup::Name(name)
    }
}

impl From<isize> for RuleLookup<'static> {
    fn from(index: isize) -> Self {
        RuleLookup::Index(index)
    }
}

impl From<i32> for RuleLookup<'static> {
    fn from(index: i32) -> Self {
        RuleLookup::Index(index as isize)
    }
}

impl SubredditRules {
    /// Creates a handle on the rule listing of `subreddit`. No request
    /// happens until the first read.
    pub fn new(subreddit: &str) -> SubredditRules {
        SubredditRules {
            inner: Arc::new(Inner {
                subreddit: subreddit.to_string(),
                cache: Mutex::new(None),
            }),
        }
    }

    /// Returns the name of the subreddit this listing belongs to.
    pub fn subreddit(&self) -> &str {
        &self.inner.subreddit
    }

    /// Returns the cached listing, fetching it if absent.
    ///
    /// The cache lock is held across the fetch, so concurrent first reads
    /// block on one in-flight request instead of racing.
    pub(crate) async fn entries(&self, client: &Client) -> Result<Arc<Vec<RuleData>>> {
        let mut cache = self.inner.cache.lock().await;
        if let Some(entries) = &*cache {
            return Ok(entries.clone());
        }
        let path = format!("r/{}/about/rules.json?raw_json=1", self.inner.subreddit);
        let page: RulesPage = client.get_json(&path).await?;
        let entries = Arc::new(page.rules);
        log::debug!(
            "populated rule cache for r/{} with {} rules",
            self.inner.subreddit,
            entries.len()
        );
        *cache = Some(entries.clone());
        Ok(entries)
    }

    /// Discards the cached listing; the next read re-fetches.
    pub async fn invalidate(&self) {
        log::debug!("invalidated rule cache for r/{}", self.inner.subreddit);
        *self.inner.cache.lock().await = None;
    }

    /// Returns a rule by name or by position.
    ///
    /// Name lookups return an unfetched stub without touching the network;
    /// the stub resolves against this listing on first attribute access.
    /// Positional lookups materialize the cached listing and return a
    /// fetched rule.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] for a position outside the listing, or any
    /// error from fetching the listing.
    pub async fn get<'a>(
        &self,
        client: &Client,
        lookup: impl Into<RuleLookup<'a>>,
    ) -> Result<Rule> {
        match lookup.into() {
            RuleLookup::Name(name) => Ok(Rule::stub(self, name)),
            RuleLookup::Index(index) => {
                let entries = self.entries(client).await?;
                let pos = resolve(index, entries.len())?;
                Ok(Rule::fetched(self, entries[pos].clone()))
            }
        }
    }

    /// Iterates over all rules in server (priority) order.
    ///
    /// The first call populates the cache with one request; later calls
    /// reuse it, so re-iterating is free until the cache is invalidated.
    ///
    /// # Errors
    ///
    /// Any error from fetching the listing.
    pub async fn iter(&self, client: &Client) -> Result<std::vec::IntoIter<Rule>> {
        let entries = self.entries(client).await?;
        let rules: Vec<Rule> = entries
            .iter()
            .map(|data| Rule::fetched(self, data.clone()))
            .collect();
        Ok(rules.into_iter())
    }

    /// Adds a rule to the subreddit and returns it.
    ///
    /// When `violation_reason` is `None` the rule name is used as the
    /// reason, mirroring what the site does. The cache is invalidated on
    /// success.
    ///
    /// # Errors
    ///
    /// Any transport or API error from the add endpoint.
    pub async fn add(
        &self,
        client: &Client,
        short_name: &str,
        kind: RuleKind,
        description: &str,
        violation_reason: Option<&str>,
    ) -> Result<Rule> {
        let violation_reason = violation_reason.unwrap_or(short_name);
        let body = form::pairs(&[
            ("api_type", "json"),
            ("r", self.subreddit()),
            ("short_name", short_name),
            ("kind", kind.as_str()),
            ("description", description),
            ("violation_reason", violation_reason),
        ]);
        let data = client
            .post_api("api/add_subreddit_rule", body)
            .await?
            .into_rule()?;
        log::info!("added rule {short_name} to r/{}", self.subreddit());
        self.invalidate().await;
        Ok(Rule::fetched(self, data))
    }

    /// Replaces the ordering of the whole listing.
    ///
    /// `order` must name every rule of the subreddit; the server rejects
    /// partial orderings. The names are joined with `,` into the
    /// `new_rule_order` parameter; each name is percent-encoded on its own
    /// so the delimiting commas stay literal. Returns the authoritative new
    /// ordering and invalidates the cache.
    ///
    /// # Errors
    ///
    /// Any transport or API error from the reorder endpoint.
    pub async fn reorder(&self, client: &Client, order: &[Rule]) -> Result<Vec<Rule>> {
        let mut body = form::pairs(&[("api_type", "json"), ("r", self.subreddit())]);
        body.push_str("&new_rule_order=");
        body.push_str(&form::comma_list(order.iter().map(Rule::short_name)));

        let reordered = client
            .post_api("api/reorder_subreddit_rules", body)
            .await?
            .into_rules();
        log::info!("reordered {} rules in r/{}", reordered.len(), self.subreddit());
        self.invalidate().await;
        Ok(reordered
            .into_iter()
            .map(|data| Rule::fetched(self, data))
            .collect())
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn resolve(index: isize, len: usize) -> Result<usize> {
    let pos = if index < 0 {
        index + len as isize
    } else {
        index
    };
    if pos < 0 || pos as usize >= len {
        return Err(Error::OutOfBounds { index, len });
    }
    Ok(pos as usize)
}

#[cfg(test)]
mod tests {
    use super::resolve;
    use crate::error::Error;

    #[test]
    fn negative_indices_count_from_the_end() {
        assert_eq!(resolve(0, 4).unwrap(), 0);
        assert_eq!(resolve(3, 4).unwrap(), 3);
        assert_eq!(resolve(-1, 4).unwrap(), 3);
        assert_eq!(resolve(-4, 4).unwrap(), 0);
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        for index in [4, -5, isize::MAX, isize::MIN] {
            assert!(matches!(
                resolve(index, 4),
                Err(Error::OutOfBounds { len: 4, .. })
            ));
        }
        assert!(matches!(
            resolve(0, 0),
            Err(Error::OutOfBounds { index: 0, len: 0 })
        ));
    }
}
