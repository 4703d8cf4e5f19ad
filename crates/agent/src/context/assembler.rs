//! Context assembly: admission decision + retrieved data + availability
//! → one payload for the prompt builder.
//!
//! # Rendering
//!
//! [`ContextPayload::render`] turns the payload into labelled text sections
//! under a token budget. Sections are filled in priority order:
//!
//! | Section                    | Trim strategy              |
//! |----------------------------|----------------------------|
//! | `[Business Profile]`       | all or nothing             |
//! | `[Calendar Availability]`  | all or nothing             |
//! | `[Knowledge]`              | lowest similarity dropped  |
//! | `[Successful Examples]`    | lowest similarity dropped  |
//! | `[Unsuccessful Examples]`  | lowest similarity dropped  |
//!
//! Rendering is deterministic: identical payloads give identical text.

use dealdesk_availability::AvailabilityReport;
use dealdesk_core::calendar::CalendarEvent;
use dealdesk_core::error::{Error, Result};
use dealdesk_core::quota::QuotaDecision;
use dealdesk_core::retrieval::{BusinessProfile, RetrievedRecord};
use dealdesk_core::tenant::TenantId;
use serde::{Deserialize, Serialize};

use crate::context::aggregator::{AggregatedContext, DegradedSource};
use crate::context::token;

/// Everything the prompt builder may use for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPayload {
    pub tenant: TenantId,
    /// Credits left before this turn is charged. Infinite for unlimited plans.
    pub remaining_credits: f64,
    pub success_examples: Vec<RetrievedRecord>,
    pub failure_examples: Vec<RetrievedRecord>,
    pub knowledge_docs: Vec<RetrievedRecord>,
    pub business_profile: Option<BusinessProfile>,
    pub calendar_events: Option<Vec<CalendarEvent>>,
    /// Present only when calendar retrieval was attempted and succeeded.
    pub availability: Option<AvailabilityReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_sources: Vec<DegradedSource>,
}

/// Token budget for rendering.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    pub total: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self { total: 4096 }
    }
}

/// Rendered prompt context plus what was left out.
#[derive(Debug, Clone)]
pub struct RenderedContext {
    pub text: String,
    pub metadata: RenderMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderMetadata {
    pub total_tokens: usize,
    pub budget: usize,
    pub sections: Vec<SectionStats>,
    pub drops: Vec<DropInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionStats {
    pub name: String,
    pub tokens: usize,
    pub items_included: usize,
    pub items_total: usize,
}

/// Items dropped from a section during budget enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropInfo {
    pub section: String,
    pub items_dropped: usize,
    pub tokens_dropped: usize,
    pub reason: String,
}

/// Stateless; create one and reuse it.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    budget: TokenBudget,
}

impl ContextAssembler {
    pub fn new(budget: TokenBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    /// Bundle the admission decision, the gathered context and the
    /// availability report.
    ///
    /// A denied decision yields [`Error::QuotaExceeded`] and the context is
    /// discarded untouched.
    pub fn compose(
        &self,
        tenant: &TenantId,
        decision: QuotaDecision,
        context: AggregatedContext,
        availability: Option<AvailabilityReport>,
    ) -> Result<ContextPayload> {
        if !decision.allowed {
            return Err(Error::QuotaExceeded {
                tenant: tenant.to_string(),
                remaining: decision.remaining,
            });
        }

        let availability = if context.calendar_available() {
            availability
        } else {
            None
        };

        Ok(ContextPayload {
            tenant: tenant.clone(),
            remaining_credits: decision.remaining,
            success_examples: context.success_examples,
            failure_examples: context.failure_examples,
            knowledge_docs: context.knowledge_docs,
            business_profile: context.business_profile,
            calendar_events: context.calendar_events,
            availability,
            degraded_sources: context.degraded_sources,
        })
    }

    /// Render `payload` with this assembler's budget.
    pub fn render(&self, payload: &ContextPayload) -> RenderedContext {
        payload.render(self.budget)
    }
}

impl ContextPayload {
    /// Render labelled sections within `budget`.
    pub fn render(&self, budget: TokenBudget) -> RenderedContext {
        let mut remaining = budget.total;
        let mut sections = Vec::new();
        let mut stats = Vec::new();
        let mut drops = Vec::new();

        let blocks = [
            ("business_profile", self.profile_block()),
            ("calendar_availability", self.availability_block()),
        ];
        for (name, block) in blocks {
            let Some(block) = block else { continue };
            let tokens = token::estimate_tokens(&block);
            if tokens <= remaining {
                remaining -= tokens;
                sections.push(block);
                stats.push(SectionStats {
                    name: name.into(),
                    tokens,
                    items_included: 1,
                    items_total: 1,
                });
            } else {
                stats.push(empty_stats(name, 1));
                drops.push(DropInfo {
                    section: name.into(),
                    items_dropped: 1,
                    tokens_dropped: tokens,
                    reason: "Section does not fit the remaining budget".into(),
                });
            }
        }

        let lists = [
            ("knowledge", "[Knowledge]\n", &self.knowledge_docs),
            ("success_examples", "[Successful Examples]\n", &self.success_examples),
            ("failure_examples", "[Unsuccessful Examples]\n", &self.failure_examples),
        ];
        for (name, header, records) in lists {
            let (section, section_stats, drop) = render_records(name, header, records, remaining);
            remaining -= section_stats.tokens;
            if !section.is_empty() {
                sections.push(section);
            }
            stats.push(section_stats);
            drops.extend(drop);
        }

        let total_tokens = stats.iter().map(|s| s.tokens).sum();
        RenderedContext {
            text: sections.join("\n"),
            metadata: RenderMetadata {
                total_tokens,
                budget: budget.total,
                sections: stats,
                drops,
            },
        }
    }

    fn profile_block(&self) -> Option<String> {
        let profile = self.business_profile.as_ref()?;
        let mut out = format!("[Business Profile]\nCompany: {}\n", profile.company_name);
        if !profile.description.is_empty() {
            out.push_str(&format!("{}\n", profile.description));
        }
        if !profile.products.is_empty() {
            out.push_str(&format!("Products: {}\n", profile.products.join(", ")));
        }
        for (key, value) in &profile.details {
            match value {
                serde_json::Value::String(s) => out.push_str(&format!("{key}: {s}\n")),
                other => out.push_str(&format!("{key}: {other}\n")),
            }
        }
        Some(out)
    }

    fn availability_block(&self) -> Option<String> {
        match (&self.availability, &self.calendar_events) {
            (Some(report), _) => Some(format!("[Calendar Availability]\n{}\n", report.render())),
            (None, Some(_)) => Some(
                "[Calendar Availability]\nCalendar not available. Do not propose specific times.\n"
                    .into(),
            ),
            (None, None) => None,
        }
    }
}

/// Highest-similarity records first; whatever does not fit is dropped.
fn render_records(
    name: &str,
    header: &str,
    records: &[RetrievedRecord],
    budget: usize,
) -> (String, SectionStats, Option<DropInfo>) {
    if records.is_empty() {
        return (String::new(), empty_stats(name, 0), None);
    }

    let header_tokens = token::estimate_tokens(header);
    if header_tokens >= budget {
        let tokens_dropped = records
            .iter()
            .map(|r| token::estimate_tokens(&record_line(r)))
            .sum();
        return (
            String::new(),
            empty_stats(name, records.len()),
            Some(DropInfo {
                section: name.into(),
                items_dropped: records.len(),
                tokens_dropped,
                reason: format!("No budget available for {name}"),
            }),
        );
    }

    let mut ranked: Vec<&RetrievedRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut used = header_tokens;
    let mut lines = Vec::new();
    let mut dropped = 0;
    let mut tokens_dropped = 0;

    for record in ranked {
        let line = record_line(record);
        let line_tokens = token::estimate_tokens(&line);
        if used + line_tokens <= budget {
            lines.push(line);
            used += line_tokens;
        } else {
            dropped += 1;
            tokens_dropped += line_tokens;
        }
    }

    let included = lines.len();
    let (section, used) = if lines.is_empty() {
        (String::new(), 0)
    } else {
        (format!("{header}{}", lines.concat()), used)
    };

    let drop = (dropped > 0).then(|| DropInfo {
        section: name.into(),
        items_dropped: dropped,
        tokens_dropped,
        reason: "Lowest-similarity records dropped".into(),
    });

    (
        section,
        SectionStats {
            name: name.into(),
            tokens: used,
            items_included: included,
            items_total: records.len(),
        },
        drop,
    )
}

fn record_line(record: &RetrievedRecord) -> String {
    format!("- {}\n", record.content.trim())
}

fn empty_stats(name: &str, total: usize) -> SectionStats {
    SectionStats {
        name: name.into(),
        tokens: 0,
        items_included: 0,
        items_total: total,
    }
}
