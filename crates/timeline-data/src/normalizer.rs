//! Conversion of raw visit rows into canonical [`VisitRecord`]s.

use timeline_core::models::{ExtraMetadata, VisitRecord};
use timeline_core::time_utils::TimestampConverter;
use timeline_core::transition::TransitionDecoder;
use timeline_core::url_utils::network_location;
use tracing::{debug, trace};

use crate::source::RawVisitRow;

/// Builds [`VisitRecord`]s from [`RawVisitRow`]s.
///
/// Normalization is total: every per-field failure resolves to a documented
/// fallback and the record is still produced.
pub struct RecordNormalizer;

impl RecordNormalizer {
    /// Normalize a batch, preserving input order.
    pub fn normalize_all(rows: Vec<RawVisitRow>) -> Vec<VisitRecord> {
        let records: Vec<VisitRecord> = rows.into_iter().map(Self::normalize).collect();
        debug!("Normalized {} visit records", records.len());
        records
    }

    /// Normalize a single row.
    pub fn normalize(row: RawVisitRow) -> VisitRecord {
        let url = row.url.unwrap_or_default();
        let title = row.title.unwrap_or_default();

        let domain = match network_location(&url) {
            Ok(location) => location,
            Err(e) => {
                trace!(error = %e, "using empty domain for unparsable url");
                String::new()
            }
        };

        let visit_time_raw = row.visit_time.unwrap_or(0);
        let last_visit_time_raw = row.last_visit_time.unwrap_or(0);
        let last_visit_time =
            (last_visit_time_raw != 0).then(|| TimestampConverter::to_instant(last_visit_time_raw));

        let transition_raw = row.transition.unwrap_or(0);
        let (transition_type, transition_qualifiers) = TransitionDecoder::decode_raw(transition_raw);

        let extra_metadata: ExtraMetadata = row
            .extra
            .into_iter()
            .map(|col| (col.table.key(&col.name), col.value))
            .collect();

        VisitRecord {
            url,
            title,
            timestamp: TimestampConverter::to_instant(visit_time_raw),
            domain,
            visit_count: row.visit_count,
            typed_count: row.typed_count,
            hidden: row.hidden,
            last_visit_time,
            from_visit: row.from_visit.filter(|&id| id != 0),
            transition_type,
            transition_qualifiers,
            transition_raw,
            visit_id: row.visit_id.unwrap_or(0),
            url_id: row.url_id.unwrap_or(0),
            visit_time_raw,
            last_visit_time_raw,
            extra_metadata,
            source: None,
        }
    }
}
