// Sync pipeline: upstream TOC → data location → database

use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::db::repositories::LawStore;
use crate::errors::IngestError;
use crate::gii::parsing::parse_law;
use crate::gii::{LawDataLocation, LawSource};
use crate::models::NewLaw;
use crate::telemetry;

/// Log progress every this many laws within a phase
const PROGRESS_INTERVAL: usize = 250;

/// Slugs to keep for laws whose abbreviations collide, keyed by shared slug
const SLUG_OVERRIDES: &[(&str, &[(&str, &str)])] = &[
    ("aeg", &[("aeg_1994", "aeg"), ("aeg", "aeg_2")]),
    ("afrg", &[("altfrg", "afrg"), ("afrg", "afrg_2")]),
    ("gbv", &[("gbv_2011", "gbv")]),
    ("stvo", &[("stvo_2013", "stvo")]),
];

/// How two snapshots of law slugs differ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlugDiff {
    pub existing: BTreeSet<String>,
    pub new: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

/// Outcome of [`download_laws`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub new: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Outcome of [`ingest_data_from_location`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub new: usize,
    pub updated: usize,
    pub removed: usize,
    /// Laws skipped because their XML could not be parsed
    pub failed: Vec<String>,
    pub slugs_fixed: usize,
}

/// Compare the previous set of slugs with the current one
///
/// Refuses to report more than `max_removals` removals: an upstream outage
/// must not wipe the local corpus.
pub fn calculate_diff<I, J, S>(previous: I, current: J, max_removals: usize) -> Result<SlugDiff, IngestError>
where
    I: IntoIterator<Item = S>,
    J: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let previous: BTreeSet<String> = previous.into_iter().map(|s| s.as_ref().to_string()).collect();
    let current: BTreeSet<String> = current.into_iter().map(|s| s.as_ref().to_string()).collect();

    let removed: BTreeSet<String> = previous.difference(&current).cloned().collect();
    if removed.len() > max_removals {
        return Err(IngestError::DubiousRemovalCount {
            count: removed.len(),
            limit: max_removals,
        });
    }

    Ok(SlugDiff {
        existing: previous.intersection(&current).cloned().collect(),
        new: current.difference(&previous).cloned().collect(),
        removed,
    })
}

fn log_progress(phase: &str, done: usize, total: usize) {
    if done % PROGRESS_INTERVAL == 0 || done == total {
        info!(phase = phase, done = done, total = total, "Progress");
    }
}

/// Bring the data location in line with the upstream table of contents
#[instrument(skip_all)]
pub async fn download_laws(
    location: &dyn LawDataLocation,
    source: &dyn LawSource,
    max_removals: usize,
) -> Result<DownloadSummary, IngestError> {
    info!("Fetching table of contents");
    let download_urls = source.fetch_toc().await?;

    info!("Loading timestamps");
    let laws_on_disk = location.list_slugs_with_timestamps().await?;
    let diff = calculate_diff(laws_on_disk.keys(), download_urls.keys(), max_removals)?;

    let phase = "Checking existing laws for updates";
    info!(count = diff.existing.len(), "{}", phase);
    let mut updated = BTreeSet::new();
    for (done, slug) in diff.existing.iter().enumerate() {
        if let (Some(url), Some(timestamp)) = (download_urls.get(slug), laws_on_disk.get(slug)) {
            if source.has_update(url, timestamp).await? {
                updated.insert(slug.clone());
            }
        }
        log_progress(phase, done + 1, diff.existing.len());
    }

    let to_fetch: BTreeSet<&String> = diff.new.iter().chain(updated.iter()).collect();
    let phase = "Adding new and updated laws";
    info!(count = to_fetch.len(), "{}", phase);
    for (done, slug) in to_fetch.iter().enumerate() {
        if let Some(url) = download_urls.get(*slug) {
            let archive = source.download_law(url).await?;
            location.create_or_replace_law(slug, &archive).await?;
            telemetry::record_law_downloaded(slug);
        }
        log_progress(phase, done + 1, to_fetch.len());
    }

    let phase = "Deleting removed laws";
    info!(count = diff.removed.len(), "{}", phase);
    for (done, slug) in diff.removed.iter().enumerate() {
        location.remove_law(slug).await?;
        log_progress(phase, done + 1, diff.removed.len());
    }

    let summary = DownloadSummary {
        new: diff.new.len(),
        updated: updated.len(),
        removed: diff.removed.len(),
    };
    info!(?summary, "Download finished");
    Ok(summary)
}

/// Bring the database in line with the data location
#[instrument(skip_all)]
pub async fn ingest_data_from_location(
    store: &dyn LawStore,
    location: &dyn LawDataLocation,
    max_removals: usize,
) -> Result<IngestSummary, IngestError> {
    let started = Instant::now();

    info!("Loading timestamps");
    let laws_on_disk = location.list_slugs_with_timestamps().await?;
    let laws_in_db = store.gii_slugs_with_timestamps().await?;
    let diff = calculate_diff(laws_in_db.keys(), laws_on_disk.keys(), max_removals)?;

    let updated: BTreeSet<&String> = diff
        .existing
        .iter()
        .filter(|slug| match (laws_on_disk.get(*slug), laws_in_db.get(*slug)) {
            (Some(on_disk), Some(in_db)) => on_disk > in_db,
            _ => false,
        })
        .collect();

    let to_ingest: BTreeSet<&String> = diff.new.iter().chain(updated.iter().copied()).collect();
    let phase = "Adding new and updated laws";
    info!(count = to_ingest.len(), "{}", phase);
    let mut failed = Vec::new();
    for (done, slug) in to_ingest.iter().enumerate() {
        match ingest_law(store, location, slug).await {
            Ok(_) => telemetry::record_law_ingested(),
            Err(IngestError::Parse { slug, source }) => {
                error!(gii_slug = %slug, error = %source, "Skipping law that failed to parse");
                telemetry::record_parse_failure(&slug);
                failed.push(slug);
            }
            Err(e) => return Err(e),
        }
        log_progress(phase, done + 1, to_ingest.len());
    }

    let slugs_fixed = fixup_slug_duplicates(store).await?;

    info!(count = diff.removed.len(), "Deleting removed laws");
    let removed: Vec<String> = diff.removed.iter().cloned().collect();
    store.delete_laws_by_gii_slug(&removed).await?;
    telemetry::record_laws_removed(removed.len());

    let summary = IngestSummary {
        new: diff.new.len(),
        updated: updated.len(),
        removed: removed.len(),
        failed,
        slugs_fixed,
    };
    telemetry::record_ingest_duration(started.elapsed().as_secs_f64());
    info!(?summary, "Ingest finished");
    Ok(summary)
}

/// Parse one law from the data location and store it
#[instrument(skip(store, location))]
pub async fn ingest_law(
    store: &dyn LawStore,
    location: &dyn LawDataLocation,
    gii_slug: &str,
) -> Result<i32, IngestError> {
    let xml = location.xml_for(gii_slug).await?;
    let parsed = parse_law(&xml).map_err(|source| IngestError::Parse {
        slug: gii_slug.to_string(),
        source,
    })?;
    let attachments = location.attachments(gii_slug).await?;

    let law = NewLaw::from_parsed(parsed, gii_slug, attachments);
    Ok(store.replace_law(&law).await?)
}

/// Slug a law ends up with when its abbreviation slug `shared_slug` collides
pub fn deduplicated_slug<'a>(shared_slug: &str, gii_slug: &'a str) -> &'a str {
    SLUG_OVERRIDES
        .iter()
        .find(|(slug, _)| *slug == shared_slug)
        .and_then(|(_, overrides)| overrides.iter().find(|(from, _)| *from == gii_slug))
        .map(|(_, to)| *to)
        .unwrap_or(gii_slug)
}

/// Give laws with colliding slugs their GII slug (or a curated override)
///
/// Returns the number of slugs changed.
#[instrument(skip(store))]
pub async fn fixup_slug_duplicates(store: &dyn LawStore) -> Result<usize, IngestError> {
    let groups = store.duplicate_slug_groups().await?;
    let mut changed = 0;

    for group in groups {
        let Some(shared_slug) = group.first().map(|law| law.slug.clone()) else {
            continue;
        };
        for law in &group {
            let slug = deduplicated_slug(&shared_slug, &law.gii_slug);
            if slug != law.slug {
                store.update_slug(law.id, slug).await?;
                changed += 1;
            }
        }
    }

    if changed > 0 {
        warn!(changed = changed, "Resolved duplicate slugs");
    }
    Ok(changed)
}
