use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use apiary_store::BlobStore;
use apiary_txn::Quorum;
use apiary_types::{
    CancelToken, CellAddress, CodePrivileges, GridCoordinate, GridKind, TypeError,
};

use crate::error::PublishError;
use crate::lifecycle::{CellLifecycle, PublishRequest};

/// Default page-image path; `{index}` is replaced by the image index.
pub const DEFAULT_IMAGE_PATH_TEMPLATE: &str = "/r.img/pages/IMG_0{index}.jpg";

/// Page numbers start here: the first page of a volume is `Page100`.
pub const FIRST_PAGE_NUMBER: u32 = 100;

/// One volume of fixed content to seed: a titled run of pages laid out
/// along one grid row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedVolume {
    /// Volume title; also the volume's own address.
    pub title: String,
    /// Chapter number bound to the volume's first page.
    pub chapter: u32,
    pub page_count: u32,
    /// Image index of the first page; later pages count up from it.
    pub start_image_index: u32,
}

impl SeedVolume {
    /// Addresses bound to one page, primary first. The first page also
    /// carries the chapter and volume aliases, so `"<Title>"` and
    /// `"<Title>/Chapter<N>"` land on the same cell as `"<Title>/Page100"`.
    fn page_addresses(&self, page_index: u32) -> Result<Vec<CellAddress>, TypeError> {
        let mut addresses = vec![CellAddress::parse(&format!(
            "{}/Page{}",
            self.title,
            FIRST_PAGE_NUMBER + page_index
        ))?];
        if page_index == 0 {
            addresses.push(CellAddress::parse(&format!(
                "{}/Chapter{}",
                self.title, self.chapter
            ))?);
            addresses.push(CellAddress::parse(&self.title)?);
        }
        Ok(addresses)
    }
}

/// One cell the seeding run could not publish.
#[derive(Debug)]
pub struct SeedFailure {
    pub volume: String,
    /// User-visible page number (first page is 100).
    pub page: u32,
    pub error: PublishError,
}

/// Outcome of one seeding run.
#[derive(Debug)]
pub struct SeedReport {
    pub attempted: u32,
    pub succeeded: u32,
    pub failures: Vec<SeedFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SeedReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The administrative seeding job: publishes every page of every volume
/// through the lifecycle, one independent cell at a time.
///
/// Page cells land at coordinate `(page_index, volume_row)` on the target
/// grid. Re-running the job against an existing grid republishes in
/// place; a page whose aliases already match runs no transaction at all.
pub struct Seeder<'a, S: BlobStore> {
    lifecycle: &'a CellLifecycle<S>,
    grid: GridKind,
    privileges: CodePrivileges,
    quorum: Quorum,
    image_path_template: String,
}

impl<'a, S: BlobStore> Seeder<'a, S> {
    pub fn new(lifecycle: &'a CellLifecycle<S>) -> Self {
        Self {
            lifecycle,
            grid: GridKind::Active,
            privileges: CodePrivileges::open(),
            quorum: Quorum::ONE,
            image_path_template: DEFAULT_IMAGE_PATH_TEMPLATE.to_string(),
        }
    }

    pub fn with_grid(mut self, grid: GridKind) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_privileges(mut self, privileges: CodePrivileges) -> Self {
        self.privileges = privileges;
        self
    }

    pub fn with_quorum(mut self, quorum: Quorum) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn with_image_path_template(mut self, template: impl Into<String>) -> Self {
        self.image_path_template = template.into();
        self
    }

    /// Seed every page of every volume. A page that fails is recorded and
    /// the run moves on; only cancellation stops the batch early.
    pub fn run(&self, volumes: &[SeedVolume], cancel: &CancelToken) -> SeedReport {
        let started_at = Utc::now();
        let mut report = SeedReport {
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
            started_at,
            finished_at: started_at,
        };

        'volumes: for (row, volume) in volumes.iter().enumerate() {
            for page_index in 0..volume.page_count {
                if cancel.is_cancelled() {
                    warn!(
                        attempted = report.attempted,
                        "seeding cancelled before the batch finished"
                    );
                    break 'volumes;
                }
                report.attempted += 1;
                match self.seed_page(volume, row as i64, page_index, cancel) {
                    Ok(()) => report.succeeded += 1,
                    Err(error) => {
                        warn!(
                            volume = %volume.title,
                            page = FIRST_PAGE_NUMBER + page_index,
                            error = %error,
                            "seed cell failed"
                        );
                        report.failures.push(SeedFailure {
                            volume: volume.title.clone(),
                            page: FIRST_PAGE_NUMBER + page_index,
                            error,
                        });
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "seeding run finished"
        );
        report
    }

    fn seed_page(
        &self,
        volume: &SeedVolume,
        row: i64,
        page_index: u32,
        cancel: &CancelToken,
    ) -> Result<(), PublishError> {
        let request = PublishRequest {
            grid: self.grid,
            coordinate: GridCoordinate::new(page_index as i64, row),
            addresses: volume.page_addresses(page_index)?,
            privileges: self.privileges,
            source: page_source(&self.image_path(volume, page_index)),
            quorum: self.quorum,
        };
        let receipt = self.lifecycle.publish(&request, cancel)?;
        debug!(
            volume = %volume.title,
            page = FIRST_PAGE_NUMBER + page_index,
            cell = %receipt.mapping,
            created = receipt.created,
            "seeded page cell"
        );
        Ok(())
    }

    fn image_path(&self, volume: &SeedVolume, page_index: u32) -> String {
        let index = volume.start_image_index + page_index;
        self.image_path_template.replace("{index}", &index.to_string())
    }
}

/// The HTML shell a page cell serves: a full-bleed image.
fn page_source(image_path: &str) -> String {
    format!(
        "<html><head></head><body style='position:absolute; width:100%; height:100%; \
         overflow:hidden;'><img src='{image_path}'/></body></html>"
    )
}
