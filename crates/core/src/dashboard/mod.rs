//! Shared dashboard state: the current report, the open stock detail and the session.
//!
//! Locks are released before any remote call. A late stock analysis only lands when its
//! ticket still names the open selection.

use crate::derive::{self, current_price_of, price_series, DashboardSnapshot, PricePoint};
use crate::domain::report::{Report, StockItem, TrendAnalysis, TrendBias};
use crate::domain::schedule::{DayToken, ScheduleConfig};
use crate::llm::error::LlmError;
use crate::llm::{analyze_trend, MarketAnalyst};
use crate::render::change_is_positive;
use crate::session::{CredentialError, CredentialGate, SessionContext};
use crate::storage::preferences::{load_schedule, save_schedule, PreferenceStore};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const REPORT_FAILED_NOTICE: &str = "API 키가 유효하지 않거나 접근 권한이 없습니다. Google Cloud 콘솔에서 API 키를 확인하고, 필요한 경우 재발급 받아주세요.";

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Generated(Report),
    /// Another generation is still running.
    Busy,
    CredentialRequired,
    /// The key was rejected as unknown; the session was reset and selection requested again.
    CredentialReselect,
    Failed { notice: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    pub ticket: u64,
    pub item: StockItem,
    pub is_positive: bool,
    pub trend: TrendBias,
    pub prices: Vec<PricePoint>,
    pub analysis: Option<TrendAnalysis>,
}

#[derive(Debug, Default)]
struct Slots {
    report: Option<Report>,
    detail: Option<StockDetail>,
    last_ticket: u64,
}

pub struct Dashboard {
    analyst: Arc<dyn MarketAnalyst>,
    gate: CredentialGate,
    store: PreferenceStore,
    session: Mutex<SessionContext>,
    slots: Mutex<Slots>,
    report_in_flight: AtomicBool,
}

/// Clears the in-flight flag however the generation ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Dashboard {
    pub fn new(analyst: Arc<dyn MarketAnalyst>, gate: CredentialGate, store: PreferenceStore) -> Self {
        let schedule = load_schedule(&store);
        Self {
            analyst,
            gate,
            store,
            session: Mutex::new(SessionContext::new(schedule)),
            slots: Mutex::new(Slots::default()),
            report_in_flight: AtomicBool::new(false),
        }
    }

    pub async fn generate_report(&self, now: DateTime<Utc>) -> ReportOutcome {
        if self
            .report_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("report generation already running");
            return ReportOutcome::Busy;
        }
        let _guard = InFlight(&self.report_in_flight);

        if !self.gate.check(&mut *self.session.lock().await).await {
            return ReportOutcome::CredentialRequired;
        }

        let started = std::time::Instant::now();
        match self.analyst.generate_report(now).await {
            Ok(report) => {
                tracing::debug!(
                    report_id = %report.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "report slot replaced"
                );
                self.slots.lock().await.report = Some(report.clone());
                ReportOutcome::Generated(report)
            }
            Err(LlmError::MissingCredential) => {
                tracing::warn!("report requested without a usable API key");
                ReportOutcome::CredentialRequired
            }
            Err(err) if err.is_entity_not_found() => {
                tracing::warn!(error = %err, "API key rejected; requesting a new selection");
                let mut session = self.session.lock().await;
                self.gate.invalidate(&mut session);
                if let Err(select_err) = self.gate.select(&mut session).await {
                    tracing::warn!(error = %select_err, "credential reselection did not complete");
                }
                ReportOutcome::CredentialReselect
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    raw_output = err.raw_output().unwrap_or_default(),
                    "report generation failed"
                );
                ReportOutcome::Failed {
                    notice: REPORT_FAILED_NOTICE,
                }
            }
        }
    }

    pub async fn latest_report(&self) -> Option<Report> {
        self.slots.lock().await.report.clone()
    }

    /// Index strip, VIX chart and strategy card for the current report (or the defaults).
    pub async fn snapshot<R: Rng + ?Sized>(&self, rng: &mut R, today: NaiveDate) -> DashboardSnapshot {
        let indices = self
            .slots
            .lock()
            .await
            .report
            .as_ref()
            .map(|r| r.market_indices.clone());
        derive::dashboard_snapshot(rng, indices.as_deref(), today)
    }

    /// Opens a stock detail, replacing any open one, and returns its ticket.
    pub async fn open_stock<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        today: NaiveDate,
        item: StockItem,
        trend: TrendBias,
    ) -> StockDetail {
        let prices = price_series(rng, today, current_price_of(&item), trend);

        let mut slots = self.slots.lock().await;
        slots.last_ticket += 1;
        let detail = StockDetail {
            ticket: slots.last_ticket,
            is_positive: change_is_positive(&item.change),
            item,
            trend,
            prices,
            analysis: None,
        };
        slots.detail = Some(detail.clone());
        detail
    }

    /// Runs the trend analysis for `ticket`. Returns the updated detail, or `None` when the
    /// selection moved on while the call was running.
    pub async fn analyze_stock(&self, ticket: u64) -> Option<StockDetail> {
        let item = {
            let slots = self.slots.lock().await;
            match &slots.detail {
                Some(detail) if detail.ticket == ticket => detail.item.clone(),
                _ => return None,
            }
        };

        let analysis = analyze_trend(self.analyst.as_ref(), &item.ticker, &item.name).await;
        self.apply_analysis(ticket, analysis).await
    }

    pub async fn apply_analysis(&self, ticket: u64, analysis: TrendAnalysis) -> Option<StockDetail> {
        let mut slots = self.slots.lock().await;
        match slots.detail.as_mut() {
            Some(detail) if detail.ticket == ticket => {
                detail.analysis = Some(analysis);
                Some(detail.clone())
            }
            _ => {
                tracing::debug!(ticket, "discarding stale stock analysis");
                None
            }
        }
    }

    pub async fn stock_detail(&self) -> Option<StockDetail> {
        self.slots.lock().await.detail.clone()
    }

    pub async fn close_stock(&self) {
        self.slots.lock().await.detail = None;
    }

    pub async fn schedule(&self) -> ScheduleConfig {
        self.session.lock().await.schedule.clone()
    }

    pub async fn enable_schedule(&self, time: &str, days: Vec<DayToken>) -> anyhow::Result<ScheduleConfig> {
        let cfg = ScheduleConfig::enabled(time, days)?;
        self.store_schedule(cfg).await
    }

    /// Turns the schedule off, keeping its time and days.
    pub async fn disable_schedule(&self) -> anyhow::Result<ScheduleConfig> {
        let cfg = self.session.lock().await.schedule.disabled();
        self.store_schedule(cfg).await
    }

    async fn store_schedule(&self, cfg: ScheduleConfig) -> anyhow::Result<ScheduleConfig> {
        let mut session = self.session.lock().await;
        save_schedule(&self.store, &cfg)?;
        session.schedule = cfg.clone();
        Ok(cfg)
    }

    pub async fn credential_ready(&self) -> bool {
        self.gate.check(&mut *self.session.lock().await).await
    }

    pub async fn select_credential(&self) -> Result<(), CredentialError> {
        self.gate.select(&mut *self.session.lock().await).await
    }
}
