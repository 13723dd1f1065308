//! TUI application state for browsing a session report.

use std::time::Duration;

use rehearse_core::orchestrator::CommandRecord;
use rehearse_core::report::{FeatureSummary, SessionReport};

/// Which view the TUI is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    FeatureList,
    /// Records of the feature at this index of `report.summary.features`.
    FeatureDetail(usize),
    /// The record at this index of `report.records`.
    RecordDetail(usize),
    Failures,
    Help,
}

/// Application state for the TUI.
pub struct App {
    pub report: SessionReport,
    pub current_view: View,
    pub selected_feature: usize,
    pub selected_record: usize,
    pub selected_failure: usize,
    /// Vertical scroll of the record detail view.
    pub detail_scroll: u16,
    /// View to return to when leaving record detail.
    return_view: View,
    /// View to return to when leaving help.
    help_return: View,
    /// Record indices per feature, in issue order.
    feature_records: Vec<Vec<usize>>,
    /// Indices of failed records, in issue order.
    failures: Vec<usize>,
    pub tick_rate: Duration,
    pub should_quit: bool,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(report: SessionReport) -> Self {
        let feature_records = report
            .summary
            .features
            .iter()
            .map(|feature| {
                report
                    .records
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.phase == feature.key)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        let failures = report
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.verdict.passed)
            .map(|(i, _)| i)
            .collect();

        Self {
            report,
            current_view: View::FeatureList,
            selected_feature: 0,
            selected_record: 0,
            selected_failure: 0,
            detail_scroll: 0,
            return_view: View::FeatureList,
            help_return: View::FeatureList,
            feature_records,
            failures,
            tick_rate: Duration::from_millis(250),
            should_quit: false,
            status_message: None,
        }
    }

    // -- Accessors --

    pub fn features(&self) -> &[FeatureSummary] {
        &self.report.summary.features
    }

    /// Records of feature `index`, in issue order.
    pub fn records_of(&self, index: usize) -> impl Iterator<Item = &CommandRecord> {
        self.feature_records
            .get(index)
            .into_iter()
            .flatten()
            .map(move |&i| &self.report.records[i])
    }

    pub fn failures(&self) -> impl Iterator<Item = &CommandRecord> {
        self.failures.iter().map(move |&i| &self.report.records[i])
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn record(&self, index: usize) -> Option<&CommandRecord> {
        self.report.records.get(index)
    }

    // -- Navigation --

    pub fn navigate_back(&mut self) {
        match self.current_view {
            View::FeatureList => self.should_quit = true,
            View::FeatureDetail(_) | View::Failures => self.current_view = View::FeatureList,
            View::RecordDetail(_) => self.current_view = self.return_view,
            View::Help => self.current_view = self.help_return,
        }
    }

    pub fn navigate_enter(&mut self) {
        match self.current_view {
            View::FeatureList => {
                if self.selected_feature < self.features().len() {
                    self.current_view = View::FeatureDetail(self.selected_feature);
                    self.selected_record = 0;
                }
            }
            View::FeatureDetail(feature) => {
                let record = self
                    .feature_records
                    .get(feature)
                    .and_then(|records| records.get(self.selected_record));
                if let Some(&record) = record {
                    self.open_record(record);
                } else {
                    self.status_message = Some("No commands recorded for this feature".to_string());
                }
            }
            View::Failures => {
                if let Some(&record) = self.failures.get(self.selected_failure) {
                    self.open_record(record);
                }
            }
            _ => {}
        }
    }

    fn open_record(&mut self, record: usize) {
        self.return_view = self.current_view;
        self.current_view = View::RecordDetail(record);
        self.detail_scroll = 0;
    }

    pub fn move_up(&mut self) {
        match self.current_view {
            View::FeatureList => self.selected_feature = self.selected_feature.saturating_sub(1),
            View::FeatureDetail(_) => self.selected_record = self.selected_record.saturating_sub(1),
            View::Failures => self.selected_failure = self.selected_failure.saturating_sub(1),
            View::RecordDetail(_) => self.detail_scroll = self.detail_scroll.saturating_sub(1),
            View::Help => {}
        }
    }

    pub fn move_down(&mut self) {
        match self.current_view {
            View::FeatureList => {
                if self.selected_feature + 1 < self.features().len() {
                    self.selected_feature += 1;
                }
            }
            View::FeatureDetail(feature) => {
                let len = self.feature_records.get(feature).map_or(0, Vec::len);
                if self.selected_record + 1 < len {
                    self.selected_record += 1;
                }
            }
            View::Failures => {
                if self.selected_failure + 1 < self.failures.len() {
                    self.selected_failure += 1;
                }
            }
            View::RecordDetail(_) => self.detail_scroll = self.detail_scroll.saturating_add(1),
            View::Help => {}
        }
    }

    pub fn cycle_view(&mut self) {
        self.current_view = match self.current_view {
            View::FeatureList => View::Failures,
            View::Failures => View::FeatureList,
            other => other,
        };
    }

    pub fn show_help(&mut self) {
        if self.current_view != View::Help {
            self.help_return = self.current_view;
            self.current_view = View::Help;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
