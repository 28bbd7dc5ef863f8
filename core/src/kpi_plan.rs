//! KPI plan records and the in-memory lookup index.
//!
//! Plans are partitioned into two buckets: affiliate-specific ones keyed by
//! (affiliate, offer) and affiliate-agnostic ones keyed by offer alone.
//! Within a bucket, entries are kept ascending by period date so a lookup is
//! a reverse scan for the latest plan not after the as-of date. The index is
//! read-only after construction; lookups (hits and misses) are memoized.

use crate::{
    error::{KpiError, KpiResult},
    rows::KpiPlanRow,
    types::{AffiliateId, OfferId},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct KpiPlanRecord {
    pub id: i64,
    pub offer_id: OfferId,
    pub affiliate_id: Option<AffiliateId>,
    pub period_date: NaiveDate,
    /// Calls required per paid lead; values below the validity floor are
    /// unusable for projections.
    pub operator_efficiency: Option<f64>,
    pub planned_approve: Option<f64>,
    pub planned_buyout: Option<f64>,
    pub confirmation_price: Option<f64>,
    pub updated_at: Option<String>,
    pub operator_efficiency_updated_at: Option<String>,
    pub planned_approve_updated_at: Option<String>,
    pub planned_buyout_updated_at: Option<String>,
    pub confirmation_price_updated_at: Option<String>,
}

impl KpiPlanRecord {
    pub fn from_row(row: KpiPlanRow) -> KpiResult<Self> {
        // The feed contract is a strict 10-character YYYY-MM-DD.
        if row.period_date.len() != 10 {
            return Err(KpiError::InvalidPlanDate {
                date: row.period_date,
            });
        }
        let period_date = NaiveDate::parse_from_str(&row.period_date, "%Y-%m-%d").map_err(
            |_| KpiError::InvalidPlanDate {
                date: row.period_date.clone(),
            },
        )?;
        Ok(Self {
            id: row.id,
            offer_id: row.offer_id,
            affiliate_id: row.affiliate_id,
            period_date,
            operator_efficiency: row.operator_efficiency,
            planned_approve: row.planned_approve,
            planned_buyout: row.planned_buyout,
            confirmation_price: row.confirmation_price,
            updated_at: row.updated_at,
            operator_efficiency_updated_at: row.operator_efficiency_updated_at,
            planned_approve_updated_at: row.planned_approve_updated_at,
            planned_buyout_updated_at: row.planned_buyout_updated_at,
            confirmation_price_updated_at: row.confirmation_price_updated_at,
        })
    }

    pub fn describe(&self) -> String {
        format!(
            "id: {} date: {} offer: {} affiliate: {:?} efficiency: {:?}",
            self.id, self.period_date, self.offer_id, self.affiliate_id, self.operator_efficiency,
        )
    }
}

type CacheKey = (Option<AffiliateId>, OfferId, NaiveDate);

pub struct KpiPlanIndex {
    min_efficiency: f64,
    plans: Vec<KpiPlanRecord>,
    by_aff_offer: HashMap<(AffiliateId, OfferId), Vec<usize>>,
    by_offer: HashMap<OfferId, Vec<usize>>,
    // Lookup memo; misses are cached too so repeated lookups never rescan.
    cache: RefCell<HashMap<CacheKey, Option<usize>>>,
}

impl KpiPlanIndex {
    pub fn new(min_efficiency: f64) -> Self {
        Self {
            min_efficiency,
            plans: Vec::new(),
            by_aff_offer: HashMap::new(),
            by_offer: HashMap::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_rows(
        rows: impl IntoIterator<Item = KpiPlanRow>,
        min_efficiency: f64,
    ) -> KpiResult<Self> {
        let mut index = Self::new(min_efficiency);
        for row in rows {
            index.push(row)?;
        }
        Ok(index)
    }

    pub fn min_efficiency(&self) -> f64 {
        self.min_efficiency
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Insert one plan row. The feed is expected to arrive sorted ascending
    /// by period date per bucket; a violation is logged as a data-quality
    /// error and the record is placed at its sorted position so lookups stay
    /// correct.
    pub fn push(&mut self, row: KpiPlanRow) -> KpiResult<()> {
        let record = KpiPlanRecord::from_row(row)?;
        let idx = self.plans.len();

        let bucket = match record.affiliate_id {
            Some(aff) => self
                .by_aff_offer
                .entry((aff, record.offer_id))
                .or_default(),
            None => self.by_offer.entry(record.offer_id).or_default(),
        };

        if let Some(&last) = bucket.last() {
            if self.plans[last].period_date > record.period_date {
                log::error!(
                    "Out-of-order KPI plan feed\nprev: {}\nnew:  {}",
                    self.plans[last].describe(),
                    record.describe(),
                );
                let pos = bucket
                    .partition_point(|&i| self.plans[i].period_date <= record.period_date);
                bucket.insert(pos, idx);
                self.plans.push(record);
                return Ok(());
            }
        }

        bucket.push(idx);
        self.plans.push(record);
        Ok(())
    }

    /// Latest plan not after `as_of`, preferring an affiliate-specific plan
    /// over an offer-wide one when an affiliate is given.
    pub fn find(
        &self,
        affiliate_id: Option<AffiliateId>,
        offer_id: OfferId,
        as_of: NaiveDate,
    ) -> Option<&KpiPlanRecord> {
        let key = (affiliate_id, offer_id, as_of);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.map(|i| &self.plans[i]);
        }

        let mut found = None;
        if let Some(aff) = affiliate_id {
            found = self.scan(self.by_aff_offer.get(&(aff, offer_id)), as_of);
        }
        if found.is_none() {
            found = self.scan(self.by_offer.get(&offer_id), as_of);
        }

        self.cache.borrow_mut().insert(key, found);
        found.map(|i| &self.plans[i])
    }

    /// `find`, with one extra tier: when the match is an affiliate-specific
    /// plan whose operator efficiency is unset or below the validity floor,
    /// fall through to the offer-wide plan instead of returning a known-bad
    /// record.
    pub fn find_operator_efficiency(
        &self,
        affiliate_id: Option<AffiliateId>,
        offer_id: OfferId,
        as_of: NaiveDate,
    ) -> Option<&KpiPlanRecord> {
        let result = self.find(affiliate_id, offer_id, as_of)?;
        let unusable = result
            .operator_efficiency
            .map_or(true, |eff| eff < self.min_efficiency);
        if unusable && result.affiliate_id.is_some() && result.affiliate_id == affiliate_id {
            return self.find(None, offer_id, as_of);
        }
        Some(result)
    }

    fn scan(&self, bucket: Option<&Vec<usize>>, as_of: NaiveDate) -> Option<usize> {
        bucket?
            .iter()
            .rev()
            .copied()
            .find(|&i| self.plans[i].period_date <= as_of)
    }
}
