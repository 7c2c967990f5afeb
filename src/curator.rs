//! # Curated playlist pipeline
//!
//! [`PlaylistCurator`] runs five strictly sequential stages:
//!
//! 1. **Analyze** the source playlist ([`PlaylistAnalyzer`])
//! 2. **Recommend** tracks from the seeds built out of the analysis
//! 3. **Name** the new playlist
//! 4. **Create** it
//! 5. **Populate** it through the [`TrackDistributor`]
//!
//! Each stage is announced to a [`ProgressSink`] before it starts and after
//! it finishes. A structural failure (unreadable or empty source, no seeds,
//! failed creation) ends the run as [`CurationOutcome::Aborted`] and nothing
//! after that stage is attempted. A failed recommendation request counts as
//! an empty result, so the new playlist is still created. Per-track failures
//! during population only show up in the summary.

use crate::analyzer::{AnalysisResult, PlaylistAnalyzer};
use crate::distributor::{DistributionSummary, TrackDistributor};
use crate::error::MixtapeError;
use crate::seeder::build_seeds;
use crate::service::{PlaylistRef, SpotifyService, MAX_RECOMMENDATIONS};
use crate::store::LockGuard;
use chrono::NaiveDate;
use log::{info, warn};
use std::fmt;

/// Recommendations requested when no limit is given
pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurationStage {
    Analyze,
    Recommend,
    Name,
    Create,
    Populate,
}

impl CurationStage {
    pub const TOTAL: usize = 5;

    /// 1-based position in the pipeline
    pub fn number(self) -> usize {
        match self {
            CurationStage::Analyze => 1,
            CurationStage::Recommend => 2,
            CurationStage::Name => 3,
            CurationStage::Create => 4,
            CurationStage::Populate => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CurationStage::Analyze => "Analyzing source playlist",
            CurationStage::Recommend => "Fetching recommendations",
            CurationStage::Name => "Choosing a name",
            CurationStage::Create => "Creating playlist",
            CurationStage::Populate => "Adding tracks",
        }
    }
}

impl fmt::Display for CurationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.number(), Self::TOTAL, self.label())
    }
}

/// Observer for stage transitions.
pub trait ProgressSink {
    fn stage_started(&mut self, stage: CurationStage);
    fn stage_finished(&mut self, stage: CurationStage, detail: &str);
    fn aborted(&mut self, _stage: CurationStage, _error: &MixtapeError) {}
}

/// Sink that discards everything.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn stage_started(&mut self, _stage: CurationStage) {}
    fn stage_finished(&mut self, _stage: CurationStage, _detail: &str) {}
}

#[derive(Debug)]
pub struct CurationReport {
    pub playlist: PlaylistRef,
    pub analysis: AnalysisResult,
    pub recommended: Vec<String>,
    pub summary: DistributionSummary,
}

#[derive(Debug)]
pub enum CurationOutcome {
    Completed(CurationReport),
    Aborted { stage: CurationStage, error: MixtapeError },
}

pub struct PlaylistCurator<'a> {
    service: &'a dyn SpotifyService,
    guard: &'a dyn LockGuard,
    today: NaiveDate,
    limit: usize,
}

impl<'a> PlaylistCurator<'a> {
    pub fn new(service: &'a dyn SpotifyService, guard: &'a dyn LockGuard) -> Self {
        Self {
            service,
            guard,
            today: chrono::Local::now().date_naive(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Date used in generated names
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Number of recommendations to request, clamped to `1..=100`.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_RECOMMENDATIONS);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn curate(
        &self,
        source_id: &str,
        new_name: Option<&str>,
        progress: &mut dyn ProgressSink,
    ) -> CurationOutcome {
        macro_rules! abort {
            ($stage:expr, $error:expr) => {{
                let (stage, error) = ($stage, $error);
                warn!("Curation aborted at stage {}: {error}", stage.number());
                progress.aborted(stage, &error);
                return CurationOutcome::Aborted { stage, error };
            }};
        }

        // 1. Analyze
        progress.stage_started(CurationStage::Analyze);
        let analysis = match PlaylistAnalyzer::new(self.service).analyze(source_id) {
            Ok(analysis) => analysis,
            Err(e) => abort!(CurationStage::Analyze, e),
        };
        progress.stage_finished(
            CurationStage::Analyze,
            &format!(
                "{} tracks, top genres: {}",
                analysis.track_count,
                display_list(&analysis.top_genres)
            ),
        );

        // 2. Recommend
        progress.stage_started(CurationStage::Recommend);
        let seeds = build_seeds(&analysis);
        if seeds.is_empty() {
            abort!(
                CurationStage::Recommend,
                MixtapeError::EmptyInput(format!("no recommendation seeds could be built from {source_id}"))
            );
        }
        let recommended = match self.service.recommendations(&seeds, self.limit) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Recommendations unavailable for {source_id}: {e}");
                Vec::new()
            }
        };
        if recommended.is_empty() {
            warn!("No recommendations returned; the new playlist will be empty");
        }
        progress.stage_finished(
            CurationStage::Recommend,
            &format!("{} tracks recommended", recommended.len()),
        );

        // 3. Name
        progress.stage_started(CurationStage::Name);
        let name = match new_name {
            Some(name) => name.to_string(),
            None => self.default_name(source_id),
        };
        progress.stage_finished(CurationStage::Name, &name);

        // 4. Create
        progress.stage_started(CurationStage::Create);
        let playlist_id = match self
            .service
            .current_user_id()
            .and_then(|owner| self.service.create_playlist(&owner, &name))
        {
            Ok(id) => id,
            Err(e) => abort!(CurationStage::Create, MixtapeError::Creation(format!("'{name}': {e}"))),
        };
        info!("Created playlist '{name}' ({playlist_id})");
        progress.stage_finished(CurationStage::Create, &playlist_id);
        let playlist = PlaylistRef::new(playlist_id, name);

        // 5. Populate
        progress.stage_started(CurationStage::Populate);
        let summary = TrackDistributor::new(self.service, self.guard).distribute(
            &recommended,
            std::slice::from_ref(&playlist),
            false,
        );
        progress.stage_finished(
            CurationStage::Populate,
            &format!("{}/{} tracks added", summary.tracks_succeeded(), recommended.len()),
        );

        CurationOutcome::Completed(CurationReport {
            playlist,
            analysis,
            recommended,
            summary,
        })
    }

    fn default_name(&self, source_id: &str) -> String {
        match self.service.playlist_name(source_id) {
            Ok(source_name) => curated_name(&source_name, self.today),
            Err(e) => {
                warn!("Could not read the name of {source_id}: {e}");
                fallback_name(self.today)
            }
        }
    }
}

/// `Curated - {source} - {YYYY-MM-DD}`
pub fn curated_name(source_name: &str, date: NaiveDate) -> String {
    format!("Curated - {source_name} - {}", date.format("%Y-%m-%d"))
}

/// Name used when the source playlist's name is unavailable
pub fn fallback_name(date: NaiveDate) -> String {
    format!("My Curated Playlist - {}", date.format("%Y-%m-%d"))
}

fn display_list(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}
