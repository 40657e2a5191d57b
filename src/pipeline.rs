#![deny(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use crate::configuration::RunConfiguration;
use crate::contact_sheet::{ContactSheetBuilder, ImageOutcome};
use crate::error::ContextError;
use crate::fetcher::ImageFetcher;
use crate::person::PeopleDocument;

/// What happened to a single record of the people document.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Rendered { index: usize, image: ImageOutcome },
    Skipped { index: usize, reason: String },
}

/// Aggregated result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub pdf_path: PathBuf,
    pub content_pages: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl RunSummary {
    pub fn rendered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, RecordOutcome::Rendered { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.rendered()
    }

    /// Number of rendered records whose picture made it into the document.
    pub fn with_image(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| {
                matches!(
                    outcome,
                    RecordOutcome::Rendered {
                        image: ImageOutcome::Placed(_),
                        ..
                    }
                )
            })
            .count()
    }
}

/// Downloads the picture of every person and lays out the contact sheet, which is saved to the
/// PDF path of the run. The directories of the run must already exist.
///
/// Failures of a single record are logged and reported in the summary, only failures in writing
/// the document abort the run.
pub fn generate_contact_sheet(
    people_document: &PeopleDocument,
    run: &RunConfiguration,
    fetcher: &ImageFetcher,
) -> Result<RunSummary, ContextError> {
    let mut builder = ContactSheetBuilder::new(format!("contacts-{}", run.timestamp));
    builder.add_title_page(&run.started_at)?;

    let mut outcomes = Vec::with_capacity(people_document.people.len());
    for (position, person) in people_document.people.iter().enumerate() {
        let index = position + 1;
        log::info!("Processing person {}: {}", index, person.name());
        // The slot is taken even when the record ends up being skipped
        builder.page_of_record(index)?;

        if !person.has_image_field() {
            let reason = "The record has no image field";
            log::error!("Skipping person {}: {}", index, reason);
            outcomes.push(RecordOutcome::Skipped {
                index,
                reason: reason.into(),
            });
            continue;
        }

        // A URL which is not a string fails like any other download
        let (image_path, fetch_error) = match person
            .image_url()
            .and_then(|image_url| fetcher.fetch_image(image_url, &run.image_path(index)))
        {
            Ok(image_path) => (Some(image_path), None),
            Err(error) => {
                log::error!("Error downloading image for person {}: {}", index, error);
                (None, Some(error.to_string()))
            }
        };

        let outcome = match builder.add_person(index, person, image_path.as_deref()) {
            Ok(ImageOutcome::Unavailable(reason)) => RecordOutcome::Rendered {
                index,
                image: ImageOutcome::Unavailable(fetch_error.unwrap_or(reason)),
            },
            Ok(image) => RecordOutcome::Rendered { index, image },
            Err(error) => {
                log::error!("Error adding person {} to the PDF: {}", index, error);
                RecordOutcome::Skipped {
                    index,
                    reason: error.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }

    let content_pages = builder.content_pages();
    let mut pdf_document = builder.finish(run.timestamp.clone(), &run.started_at)?;
    let pdf_path = pdf_document.save_to_file(&run.pdf_path)?;

    let run_summary = RunSummary {
        pdf_path,
        content_pages,
        outcomes,
    };
    log::info!(
        "Wrote {} content pages to {:?}: {} people rendered ({} with picture), {} skipped",
        run_summary.content_pages,
        run_summary.pdf_path,
        run_summary.rendered(),
        run_summary.with_image(),
        run_summary.skipped()
    );

    Ok(run_summary)
}
