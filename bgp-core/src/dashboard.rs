//! Purchase dashboard: filter, sort, paginate, aggregate and export.
//!
//! Everything here works on an in-memory slice already loaded from the
//! database, so the numbers on one response always agree with each other.

use crate::entities::token_purchase::TokenPurchase;
use crate::entities::{PaymentNetwork, PurchaseStatus};
use bgp_sdk::objects::admin::{
    ListPurchasesQuery, ProviderBreakdown, PurchasePage, PurchaseStats, SortDirection, SortField,
    clamp_pagination,
};
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt::Write;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseFilter {
    pub status: Option<PurchaseStatus>,
    pub provider: Option<PaymentNetwork>,
    /// Case-insensitive substring of the transaction UID or phone number.
    pub search: Option<String>,
}

impl PurchaseFilter {
    pub fn from_query(query: &ListPurchasesQuery) -> Self {
        Self {
            status: query.status.map(Into::into),
            provider: query.provider.map(Into::into),
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn matches(&self, purchase: &TokenPurchase) -> bool {
        if self.status.is_some_and(|s| s != purchase.status) {
            return false;
        }
        if self.provider.is_some_and(|p| p != purchase.provider) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                purchase.transaction_uid.to_lowercase().contains(&needle)
                    || purchase.phone_number.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurchaseSort {
    pub field: SortField,
    pub direction: SortDirection,
}

fn status_rank(status: PurchaseStatus) -> u8 {
    match status {
        PurchaseStatus::Pending => 0,
        PurchaseStatus::Completed => 1,
        PurchaseStatus::Failed => 2,
    }
}

fn provider_rank(provider: PaymentNetwork) -> u8 {
    match provider {
        PaymentNetwork::Mtn => 0,
        PaymentNetwork::Airtel => 1,
        PaymentNetwork::Mpesa => 2,
    }
}

impl PurchaseSort {
    fn compare(&self, a: &TokenPurchase, b: &TokenPurchase) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Amount => a.amount_ugx.cmp(&b.amount_ugx),
            SortField::Tokens => a.tokens.cmp(&b.tokens),
            SortField::Status => status_rank(a.status).cmp(&status_rank(b.status)),
            SortField::Provider => provider_rank(a.provider).cmp(&provider_rank(b.provider)),
        };
        // Ties fall back to insertion order so pages are stable.
        let ordering = primary.then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn apply(&self, records: &mut [TokenPurchase]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

/// Filter then sort, keeping every matching record.
pub fn filter_and_sort(
    records: Vec<TokenPurchase>,
    filter: &PurchaseFilter,
    sort: PurchaseSort,
) -> Vec<TokenPurchase> {
    let mut filtered: Vec<TokenPurchase> =
        records.into_iter().filter(|p| filter.matches(p)).collect();
    sort.apply(&mut filtered);
    filtered
}

/// The records of 1-based `page`. Out-of-range pages are empty.
pub fn paginate<T>(records: &[T], page: u32, page_size: u32) -> &[T] {
    let (page, page_size) = clamp_pagination(page, page_size);
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    if start >= records.len() {
        return &[];
    }
    let end = start.saturating_add(page_size as usize).min(records.len());
    &records[start..end]
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

pub fn compute_stats(records: &[TokenPurchase]) -> PurchaseStats {
    let total = count(records.len());
    let by_status =
        |status: PurchaseStatus| count(records.iter().filter(|p| p.status == status).count());
    let completed = by_status(PurchaseStatus::Completed);
    let completed_records = || records.iter().filter(|p| p.status == PurchaseStatus::Completed);

    let success_rate = if total == 0 {
        0.0
    } else {
        (f64::from(completed) / f64::from(total) * 10_000.0).round() / 100.0
    };

    let by_provider = records
        .iter()
        .into_group_map_by(|p| p.provider)
        .into_iter()
        .sorted_by_key(|(provider, _)| provider_rank(*provider))
        .map(|(provider, group)| {
            let done: Vec<_> = group
                .iter()
                .filter(|p| p.status == PurchaseStatus::Completed)
                .collect();
            ProviderBreakdown {
                provider: provider.into(),
                total: count(group.len()),
                completed: count(done.len()),
                completed_amount_ugx: done.iter().map(|p| p.amount_ugx).sum(),
            }
        })
        .collect();

    PurchaseStats {
        total,
        completed,
        failed: by_status(PurchaseStatus::Failed),
        pending: by_status(PurchaseStatus::Pending),
        completed_amount_ugx: completed_records().map(|p| p.amount_ugx).sum(),
        tokens_sold: completed_records().map(|p| p.tokens).sum(),
        success_rate,
        by_provider,
    }
}

/// Filter, sort and aggregate a loaded window, returning the requested page.
pub fn build_page(records: Vec<TokenPurchase>, query: &ListPurchasesQuery) -> PurchasePage {
    let filter = PurchaseFilter::from_query(query);
    let sort = PurchaseSort {
        field: query.sort_by,
        direction: query.sort_dir,
    };
    let filtered = filter_and_sort(records, &filter, sort);
    let stats = compute_stats(&filtered);
    let (page, page_size) = clamp_pagination(query.page, query.page_size);
    PurchasePage {
        records: paginate(&filtered, page, page_size)
            .iter()
            .cloned()
            .map(Into::into)
            .collect(),
        stats,
        page,
        page_size,
        total_filtered: count(filtered.len()),
    }
}

const CSV_HEADER: &str = "transaction_uid,user_id,plan_id,amount_ugx,tokens,provider,\
phone_number,status,local_currency,local_amount,created_at,completed_at";

fn csv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        std::borrow::Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        std::borrow::Cow::Borrowed(value)
    }
}

fn rfc3339(timestamp: i64) -> String {
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_default()
}

/// Header plus one line per record, in the given order.
pub fn to_csv(records: &[TokenPurchase]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for p in records {
        let provider: bgp_sdk::objects::PaymentNetwork = p.provider.into();
        let status: bgp_sdk::objects::PurchaseStatus = p.status.into();
        let currency: bgp_sdk::objects::Currency = p.local_currency.into();
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&p.transaction_uid),
            p.user_id,
            csv_field(&p.plan_id),
            p.amount_ugx,
            p.tokens,
            provider,
            csv_field(&p.phone_number),
            status,
            currency,
            p.local_amount(),
            rfc3339(p.created_at),
            p.completed_at.map(rfc3339).unwrap_or_default(),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CountryCode, CurrencyCode};

    fn purchase(
        id: i64,
        status: PurchaseStatus,
        provider: PaymentNetwork,
        amount: i64,
    ) -> TokenPurchase {
        TokenPurchase {
            id,
            user_id: 1,
            transaction_uid: format!("uid-{id}"),
            plan_id: "starter".into(),
            amount_ugx: amount,
            tokens: amount / 50,
            provider,
            phone_number: format!("+2567712345{id:02}"),
            status,
            payment_url: None,
            provider_reference: None,
            local_country: CountryCode::Ug,
            local_currency: CurrencyCode::Ugx,
            local_amount_minor: amount,
            created_at: 1_700_000_000 + id,
            completed_at: (status == PurchaseStatus::Completed).then_some(1_700_000_100 + id),
        }
    }

    fn sample() -> Vec<TokenPurchase> {
        vec![
            purchase(1, PurchaseStatus::Completed, PaymentNetwork::Mtn, 5000),
            purchase(2, PurchaseStatus::Failed, PaymentNetwork::Airtel, 10000),
            purchase(3, PurchaseStatus::Pending, PaymentNetwork::Mtn, 5000),
            purchase(4, PurchaseStatus::Completed, PaymentNetwork::Airtel, 20000),
            purchase(5, PurchaseStatus::Completed, PaymentNetwork::Mtn, 10000),
            purchase(6, PurchaseStatus::Pending, PaymentNetwork::Mpesa, 5000),
        ]
    }

    #[test]
    fn stats_over_all_records() {
        let stats = compute_stats(&sample());
        assert_eq!(stats.total, 6);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.completed_amount_ugx, 35000);
        assert_eq!(stats.tokens_sold, 700);
        assert_eq!(stats.success_rate, 50.0);

        let providers: Vec<_> = stats
            .by_provider
            .iter()
            .map(|b| (b.provider, b.total, b.completed))
            .collect();
        assert_eq!(
            providers,
            vec![
                (bgp_sdk::objects::PaymentNetwork::Mtn, 3, 2),
                (bgp_sdk::objects::PaymentNetwork::Airtel, 2, 1),
                (bgp_sdk::objects::PaymentNetwork::Mpesa, 1, 0),
            ]
        );
    }

    #[test]
    fn success_rate_is_rounded_and_zero_when_empty() {
        let records = vec![
            purchase(1, PurchaseStatus::Completed, PaymentNetwork::Mtn, 5000),
            purchase(2, PurchaseStatus::Failed, PaymentNetwork::Mtn, 5000),
            purchase(3, PurchaseStatus::Failed, PaymentNetwork::Mtn, 5000),
        ];
        assert_eq!(compute_stats(&records).success_rate, 33.33);
        assert_eq!(compute_stats(&[]).success_rate, 0.0);
    }

    #[test]
    fn filter_by_status_provider_and_search() {
        let filter = PurchaseFilter {
            status: Some(PurchaseStatus::Completed),
            provider: Some(PaymentNetwork::Mtn),
            search: None,
        };
        let ids: Vec<_> = filter_and_sort(sample(), &filter, PurchaseSort::default())
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![5, 1]);

        let search = PurchaseFilter {
            search: Some("UID-4".into()),
            ..Default::default()
        };
        let found = filter_and_sort(sample(), &search, PurchaseSort::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 4);
    }

    #[test]
    fn sort_by_amount_ascending_breaks_ties_by_id() {
        let sort = PurchaseSort {
            field: SortField::Amount,
            direction: SortDirection::Asc,
        };
        let ids: Vec<_> = filter_and_sort(sample(), &PurchaseFilter::default(), sort)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 6, 2, 5, 4]);
    }

    #[test]
    fn pagination_bounds() {
        let records = sample();
        assert_eq!(paginate(&records, 1, 4).len(), 4);
        assert_eq!(paginate(&records, 2, 4).len(), 2);
        assert!(paginate(&records, 3, 4).is_empty());
        assert_eq!(paginate(&records, 0, 0).len(), 1);
    }

    #[test]
    fn page_stats_cover_the_filtered_set() {
        let query = ListPurchasesQuery {
            status: Some(bgp_sdk::objects::PurchaseStatus::Completed),
            page_size: 2,
            ..Default::default()
        };
        let page = build_page(sample(), &query);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total_filtered, 3);
        assert_eq!(page.stats.total, 3);
        assert_eq!(page.stats.success_rate, 100.0);
    }

    #[test]
    fn csv_row_count_matches_filtered_count() {
        let filter = PurchaseFilter {
            status: Some(PurchaseStatus::Pending),
            ..Default::default()
        };
        let filtered = filter_and_sort(sample(), &filter, PurchaseSort::default());
        let csv = to_csv(&filtered);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), filtered.len() + 1);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("uid-6,1,starter,5000,100,M-PESA,"));
        assert!(lines[1].ends_with(",2023-11-14T22:13:26Z,"));
    }

    #[test]
    fn csv_quotes_fields_with_separators() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
