//! Alert evaluation sweep
//!
//! Walks every active alert rule against every verified user: fetches the
//! current conditions for the user's city, extracts the measured value for
//! the rule's metric, and on a threshold breach sends one HTML email and
//! records one triggered alert.
//!
//! Everything inside the sweep is sequential; a per-pair failure is logged
//! and the sweep continues. A setup failure (loading rules or users) aborts
//! the run and notifies the admin address when one is configured.
//!
//! Repeated firings for a still-true condition are suppressed by a per
//! (rule, user) cooldown; the clock is injectable so the window is testable.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::validate_email;

use crate::error::AppResult;
use crate::external::weather::{CurrentConditions, ProviderLocation, WeatherClient};
use crate::external::MailClient;
use crate::services::alert_rules::{AlertMetric, AlertRule, AlertRuleService};
use crate::services::triggered::{NewTriggeredAlert, TriggeredAlertService};
use crate::services::users::{AlertRecipient, UserService};

/// Time source, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Alert evaluation service
#[derive(Clone)]
pub struct EvaluationService {
    db: PgPool,
    weather: WeatherClient,
    mail: MailClient,
    rules: AlertRuleService,
    users: UserService,
    triggered: TriggeredAlertService,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    admin_address: Option<String>,
}

/// Summary of one evaluation sweep
#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    pub rules: usize,
    pub recipients: usize,
    pub evaluated: usize,
    pub matched: usize,
    pub suppressed: usize,
    pub emails_sent: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Outcome of one (rule, user) pair
enum PairOutcome {
    Skipped,
    NoReading,
    NoMatch,
    Suppressed,
    Fired,
}

impl EvaluationService {
    pub fn new(
        db: PgPool,
        weather: WeatherClient,
        mail: MailClient,
        clock: Arc<dyn Clock>,
        cooldown_minutes: i64,
        admin_address: Option<String>,
    ) -> Self {
        Self {
            rules: AlertRuleService::new(db.clone()),
            users: UserService::new(db.clone()),
            triggered: TriggeredAlertService::new(db.clone()),
            db,
            weather,
            mail,
            clock,
            cooldown: Duration::minutes(cooldown_minutes),
            admin_address,
        }
    }

    /// Run one full sweep over rules x users
    pub async fn run_sweep(&self) -> AppResult<SweepSummary> {
        match self.sweep_inner().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::error!(error = %e, "alert sweep aborted");
                self.notify_admin(&e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn sweep_inner(&self) -> AppResult<SweepSummary> {
        let rules = self.rules.list_active().await?;
        let recipients = self.users.list_recipients().await?;

        let mut summary = SweepSummary {
            rules: rules.len(),
            recipients: recipients.len(),
            ..Default::default()
        };

        tracing::info!(
            rules = rules.len(),
            recipients = recipients.len(),
            "starting alert evaluation sweep"
        );

        for rule in &rules {
            for recipient in &recipients {
                summary.evaluated += 1;
                match self.evaluate_pair(rule, recipient).await {
                    Ok(PairOutcome::Fired) => {
                        summary.matched += 1;
                        summary.emails_sent += 1;
                    }
                    Ok(PairOutcome::Suppressed) => {
                        summary.matched += 1;
                        summary.suppressed += 1;
                    }
                    Ok(PairOutcome::Skipped) => summary.skipped += 1,
                    Ok(PairOutcome::NoReading) | Ok(PairOutcome::NoMatch) => {}
                    Err(e) => {
                        tracing::warn!(
                            rule_id = %rule.id,
                            user_id = %recipient.id,
                            error = %e,
                            "pair evaluation failed"
                        );
                        summary.errors += 1;
                    }
                }
            }
        }

        tracing::info!(
            evaluated = summary.evaluated,
            matched = summary.matched,
            emails_sent = summary.emails_sent,
            suppressed = summary.suppressed,
            errors = summary.errors,
            "alert evaluation sweep finished"
        );

        Ok(summary)
    }

    async fn evaluate_pair(
        &self,
        rule: &AlertRule,
        recipient: &AlertRecipient,
    ) -> AppResult<PairOutcome> {
        if !validate_email(&recipient.email) {
            tracing::debug!(user_id = %recipient.id, "recipient has no usable email");
            return Ok(PairOutcome::Skipped);
        }

        let location = match recipient_location(recipient) {
            Some(location) => location,
            None => {
                tracing::debug!(user_id = %recipient.id, "recipient has no city");
                return Ok(PairOutcome::Skipped);
            }
        };

        let conditions = self.weather.get_current_conditions(&location).await?;

        let Some(measured) = extract_measured(&conditions, rule.metric) else {
            // The metric is unavailable on this endpoint; never treat that as
            // a zero reading.
            return Ok(PairOutcome::NoReading);
        };

        if !rule.threshold.matches(measured) {
            return Ok(PairOutcome::NoMatch);
        }

        let now = self.clock.now();
        let last = self.last_fired(rule.id, recipient.id).await?;
        if within_cooldown(last, now, self.cooldown) {
            tracing::debug!(rule_id = %rule.id, user_id = %recipient.id, "match inside cooldown window");
            return Ok(PairOutcome::Suppressed);
        }

        let city = recipient
            .city
            .clone()
            .unwrap_or_else(|| conditions.city_name.clone());

        let (subject, html) = build_alert_email(&recipient.username, &city, rule, measured);
        self.mail.send_html(&recipient.email, &subject, &html).await?;

        self.triggered
            .record(NewTriggeredAlert {
                user_id: recipient.id,
                rule_id: rule.id,
                city,
                metric: rule.metric,
                value: measured,
            })
            .await?;

        self.record_fired(rule.id, recipient.id, now).await?;

        tracing::info!(rule_id = %rule.id, user_id = %recipient.id, value = %measured, "alert fired");
        Ok(PairOutcome::Fired)
    }

    async fn last_fired(&self, rule_id: Uuid, user_id: Uuid) -> AppResult<Option<DateTime<Utc>>> {
        let last = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT last_fired_at FROM alert_cooldowns WHERE rule_id = $1 AND user_id = $2",
        )
        .bind(rule_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(last)
    }

    async fn record_fired(
        &self,
        rule_id: Uuid,
        user_id: Uuid,
        fired_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alert_cooldowns (rule_id, user_id, last_fired_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (rule_id, user_id) DO UPDATE SET last_fired_at = EXCLUDED.last_fired_at
            "#,
        )
        .bind(rule_id)
        .bind(user_id)
        .bind(fired_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn notify_admin(&self, detail: &str) {
        let Some(address) = &self.admin_address else {
            return;
        };

        let html = format!(
            "<h2>Alert sweep failed</h2><p>The scheduled alert evaluation aborted:</p><pre>{}</pre>",
            detail
        );

        if let Err(e) = self
            .mail
            .send_html(address, "MeteoWatch: alert sweep failed", &html)
            .await
        {
            tracing::error!(error = %e, "failed to notify admin of sweep failure");
        }
    }
}

/// Location lookup for a recipient: coordinates when the profile carries
/// them, otherwise a city-name lookup.
fn recipient_location(recipient: &AlertRecipient) -> Option<ProviderLocation> {
    if let (Some(latitude), Some(longitude)) = (recipient.latitude, recipient.longitude) {
        return Some(ProviderLocation::Coordinates {
            latitude,
            longitude,
        });
    }

    recipient
        .city
        .as_ref()
        .filter(|city| !city.trim().is_empty())
        .map(|city| ProviderLocation::City(city.clone()))
}

/// Extract the measured value for a metric from current conditions
///
/// Partial on purpose: UV is not served by the current-conditions endpoint,
/// so a UV rule yields no reading rather than a false zero. Absent rain
/// means 0 mm, which is a real reading.
pub fn extract_measured(conditions: &CurrentConditions, metric: AlertMetric) -> Option<Decimal> {
    match metric {
        AlertMetric::Temperature => Some(conditions.temperature),
        AlertMetric::Humidity => Some(Decimal::from(conditions.humidity)),
        AlertMetric::Wind => Some(conditions.wind_speed),
        AlertMetric::Pressure => Some(Decimal::from(conditions.pressure)),
        AlertMetric::Rain => Some(
            conditions
                .rain_1h_mm
                .or(conditions.rain_3h_mm)
                .unwrap_or(Decimal::ZERO),
        ),
        AlertMetric::Uv => None,
    }
}

/// Whether a match falls inside the cooldown window since the last firing
pub fn within_cooldown(
    last_fired: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    match last_fired {
        Some(last) => now - last < cooldown,
        None => false,
    }
}

/// Render the alert notification email
fn build_alert_email(
    username: &str,
    city: &str,
    rule: &AlertRule,
    measured: Decimal,
) -> (String, String) {
    let metric_label = metric_label(rule.metric);
    let subject = format!("Weather alert for {}: {}", city, metric_label);

    let html = format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif;">
    <h2>Weather alert for {city}</h2>
    <p>Hello {username},</p>
    <p>Your alert rule <strong>{description}</strong> was triggered.</p>
    <table cellpadding="6" style="border-collapse: collapse;">
      <tr><td><strong>City</strong></td><td>{city}</td></tr>
      <tr><td><strong>Metric</strong></td><td>{metric_label}</td></tr>
      <tr><td><strong>Measured value</strong></td><td>{measured}</td></tr>
      <tr><td><strong>Severity</strong></td><td>{severity:?}</td></tr>
    </table>
    <p>You receive this message because you configured this alert in MeteoWatch.</p>
  </body>
</html>"#,
        city = city,
        username = username,
        description = rule.description,
        metric_label = metric_label,
        measured = measured,
        severity = rule.severity,
    );

    (subject, html)
}

fn metric_label(metric: AlertMetric) -> &'static str {
    match metric {
        AlertMetric::Temperature => "temperature",
        AlertMetric::Humidity => "humidity",
        AlertMetric::Wind => "wind speed",
        AlertMetric::Pressure => "pressure",
        AlertMetric::Rain => "rain",
        AlertMetric::Uv => "UV index",
    }
}
