//! Price cache and resolution
//!
//! A TTL-bounded cache fed by the live price feed, with a fixed resolution
//! chain for any computation that needs a current price: live mid price,
//! then live last-trade price, then a still-valid cache entry, then the
//! static default table. The static default is the terminal fallback and
//! always succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::types::Symbol;
use crate::upstream::{PriceSource, SymbolPrice, UpstreamError};

/// Terminal fallback prices per symbol
pub const DEFAULT_PRICES: &[(&str, f64)] = &[
    ("SOL/USDC", 180.0),
    ("BTC/USDC", 65_000.0),
    ("ETH/USDC", 3_500.0),
    ("JTO/USDC", 3.0),
    ("WIF/USDC", 2.5),
];

/// Static default for a symbol; 1.0 for symbols outside the table so the
/// chain can never come up empty-handed
pub fn default_price(symbol: &str) -> f64 {
    DEFAULT_PRICES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, p)| *p)
        .unwrap_or(1.0)
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    price: f64,
    stored_at: DateTime<Utc>,
}

/// Bounded price cache with explicit time injection
///
/// All operations take `now` so tests control the clock; the `Utc::now()`
/// conveniences exist for call sites that don't care. The map is replaced
/// wholesale on a successful feed refresh, never patched entry by entry.
#[derive(Debug)]
pub struct PriceCache {
    ttl: Duration,
    entries: HashMap<Symbol, CacheEntry>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        PriceCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn insert_at(&mut self, symbol: Symbol, price: f64, now: DateTime<Utc>) {
        self.entries.insert(
            symbol,
            CacheEntry {
                price,
                stored_at: now,
            },
        );
    }

    /// Valid entry for the symbol, or None when absent or past its TTL
    pub fn get_at(&self, symbol: &Symbol, now: DateTime<Utc>) -> Option<f64> {
        self.entries
            .get(symbol)
            .filter(|e| now - e.stored_at <= self.ttl)
            .map(|e| e.price)
    }

    pub fn is_expired_at(&self, symbol: &Symbol, now: DateTime<Utc>) -> bool {
        self.get_at(symbol, now).is_none()
    }

    /// Replace the whole table with a fresh fetch result
    pub fn replace_at(&mut self, prices: HashMap<Symbol, f64>, now: DateTime<Utc>) {
        self.entries = prices
            .into_iter()
            .map(|(symbol, price)| {
                (
                    symbol,
                    CacheEntry {
                        price,
                        stored_at: now,
                    },
                )
            })
            .collect();
    }

    pub fn insert(&mut self, symbol: Symbol, price: f64) {
        self.insert_at(symbol, price, Utc::now());
    }

    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.get_at(symbol, Utc::now())
    }
}

/// Mid price if present, else last-trade price
pub fn quote_price(quote: &SymbolPrice) -> Option<f64> {
    quote.mid_price.or(quote.last_price)
}

/// Live price access backed by a primary feed (short TTL) and an optional
/// secondary fallback feed (longer TTL)
pub struct PriceService {
    primary: Arc<dyn PriceSource>,
    secondary: Option<Arc<dyn PriceSource>>,
    cache: RwLock<PriceCache>,
    secondary_cache: RwLock<PriceCache>,
}

impl PriceService {
    pub fn new(
        primary: Arc<dyn PriceSource>,
        secondary: Option<Arc<dyn PriceSource>>,
        primary_ttl: Duration,
        secondary_ttl: Duration,
    ) -> Self {
        PriceService {
            primary,
            secondary,
            cache: RwLock::new(PriceCache::new(primary_ttl)),
            secondary_cache: RwLock::new(PriceCache::new(secondary_ttl)),
        }
    }

    /// Fetch the live quote book, caching what came back
    ///
    /// A feed outage is absorbed here: the book degrades to the secondary
    /// feed and finally to an empty map, leaving per-symbol resolution to
    /// the cache and the static defaults.
    pub async fn price_book(&self) -> HashMap<Symbol, SymbolPrice> {
        match self.primary.fetch_prices().await {
            Ok(book) => {
                self.store(&self.cache, &book).await;
                book
            }
            Err(err) => {
                warn!("primary price feed unavailable: {}", err);
                self.secondary_book().await
            }
        }
    }

    async fn secondary_book(&self) -> HashMap<Symbol, SymbolPrice> {
        let Some(secondary) = &self.secondary else {
            return HashMap::new();
        };
        match secondary.fetch_prices().await {
            Ok(book) => {
                self.store(&self.secondary_cache, &book).await;
                book
            }
            Err(err) => {
                warn!("secondary price feed unavailable: {}", err);
                HashMap::new()
            }
        }
    }

    async fn store(&self, cache: &RwLock<PriceCache>, book: &HashMap<Symbol, SymbolPrice>) {
        let resolved: HashMap<Symbol, f64> = book
            .iter()
            .filter_map(|(symbol, quote)| quote_price(quote).map(|p| (symbol.clone(), p)))
            .collect();
        debug!("caching {} price entries", resolved.len());
        cache.write().await.replace_at(resolved, Utc::now());
    }

    /// Resolve one symbol against an already-fetched book
    pub async fn resolve(&self, symbol: &Symbol, book: &HashMap<Symbol, SymbolPrice>) -> f64 {
        if let Some(price) = book.get(symbol).and_then(quote_price) {
            return price;
        }

        let now = Utc::now();
        if let Some(price) = self.cache.read().await.get_at(symbol, now) {
            return price;
        }
        if let Some(price) = self.secondary_cache.read().await.get_at(symbol, now) {
            return price;
        }

        default_price(symbol.as_str())
    }

    /// Current price for one symbol through the full chain
    pub async fn current_price(&self, symbol: &Symbol) -> f64 {
        let book = self.price_book().await;
        self.resolve(symbol, &book).await
    }
}

/// A price source that always fails; stands in when no feed is configured
pub struct UnavailableFeed;

#[async_trait::async_trait]
impl PriceSource for UnavailableFeed {
    async fn fetch_prices(&self) -> Result<HashMap<Symbol, SymbolPrice>, UpstreamError> {
        Err(UpstreamError::Sdk("no price feed configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedFeed(HashMap<Symbol, SymbolPrice>);

    #[async_trait]
    impl PriceSource for FixedFeed {
        async fn fetch_prices(&self) -> Result<HashMap<Symbol, SymbolPrice>, UpstreamError> {
            Ok(self.0.clone())
        }
    }

    fn quote(mid: Option<f64>, last: Option<f64>) -> SymbolPrice {
        SymbolPrice {
            last_price: last,
            best_bid: None,
            best_ask: None,
            mid_price: mid,
        }
    }

    #[test]
    fn test_cache_respects_ttl() {
        let mut cache = PriceCache::new(Duration::seconds(10));
        let t0 = Utc::now();
        let sol = Symbol::new("SOL/USDC");

        cache.insert_at(sol.clone(), 182.5, t0);
        assert_eq!(cache.get_at(&sol, t0 + Duration::seconds(9)), Some(182.5));
        assert_eq!(cache.get_at(&sol, t0 + Duration::seconds(11)), None);
        assert!(cache.is_expired_at(&sol, t0 + Duration::seconds(11)));
    }

    #[test]
    fn test_replace_discards_stale_entries() {
        let mut cache = PriceCache::new(Duration::seconds(10));
        let t0 = Utc::now();
        let sol = Symbol::new("SOL/USDC");
        let btc = Symbol::new("BTC/USDC");

        cache.insert_at(sol.clone(), 180.0, t0);
        cache.replace_at(HashMap::from([(btc.clone(), 64_000.0)]), t0);

        assert_eq!(cache.get_at(&sol, t0), None);
        assert_eq!(cache.get_at(&btc, t0), Some(64_000.0));
    }

    #[test]
    fn test_quote_price_prefers_mid() {
        assert_eq!(quote_price(&quote(Some(100.0), Some(99.0))), Some(100.0));
        assert_eq!(quote_price(&quote(None, Some(99.0))), Some(99.0));
        assert_eq!(quote_price(&quote(None, None)), None);
    }

    #[test]
    fn test_default_price_table() {
        assert_eq!(default_price("SOL/USDC"), 180.0);
        assert_eq!(default_price("NOT/LISTED"), 1.0);
    }

    // Scenario E: total feed outage still resolves to the static default
    #[tokio::test]
    async fn test_current_price_survives_total_outage() {
        let service = PriceService::new(
            Arc::new(UnavailableFeed),
            Some(Arc::new(UnavailableFeed)),
            Duration::seconds(10),
            Duration::seconds(60),
        );

        let price = service.current_price(&Symbol::new("SOL/USDC")).await;
        assert_eq!(price, 180.0);
    }

    #[tokio::test]
    async fn test_live_book_wins_over_default() {
        let sol = Symbol::new("SOL/USDC");
        let feed = FixedFeed(HashMap::from([(sol.clone(), quote(Some(191.0), None))]));
        let service = PriceService::new(
            Arc::new(feed),
            None,
            Duration::seconds(10),
            Duration::seconds(60),
        );

        assert_eq!(service.current_price(&sol).await, 191.0);
    }

    #[tokio::test]
    async fn test_secondary_feed_fallback() {
        let sol = Symbol::new("SOL/USDC");
        let secondary = FixedFeed(HashMap::from([(sol.clone(), quote(None, Some(175.0)))]));
        let service = PriceService::new(
            Arc::new(UnavailableFeed),
            Some(Arc::new(secondary)),
            Duration::seconds(10),
            Duration::seconds(60),
        );

        assert_eq!(service.current_price(&sol).await, 175.0);
    }
}
