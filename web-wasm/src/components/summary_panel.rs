//! 集計パネル

use kaong_common::aggregate::{CategorySummary, Summary};
use kaong_common::parser::StatusClass;
use kaong_common::Category;
use leptos::prelude::*;

/// カテゴリ別の果実数
fn fruit_total(summary: &Summary, category: Category) -> u32 {
    summary.fruit_totals.get(category)
}

#[component]
pub fn SummaryPanel(summary: Signal<Summary>) -> impl IntoView {
    view! {
        <div class="summary-panel">
            <div class="stat-card">
                <span class="stat-value">{move || summary.get().total_items}</span>
                <span class="stat-label">"Total Images"</span>
            </div>
            <div class="stat-card">
                <span class="stat-value">{move || summary.get().total_fruits}</span>
                <span class="stat-label">"Total Fruits"</span>
            </div>
            <div class="stat-card">
                <span class="stat-value">{move || summary.get().average_confidence_text()}</span>
                <span class="stat-label">"Avg. Confidence"</span>
            </div>
            <div class="stat-card">
                <span class="stat-value">{move || summary.get().last_upload_text()}</span>
                <span class="stat-label">"Last Upload"</span>
            </div>
            <div class="fruit-totals">
                {Category::ALL
                    .iter()
                    .map(|category| {
                        let category = *category;
                        view! {
                            <div class=format!("stat-card {}", category.as_str().to_lowercase())>
                                <span class="stat-value">{move || fruit_total(&summary.get(), category)}</span>
                                <span class="stat-label">{category.as_str()}</span>
                            </div>
                        }
                    })
                    .collect_view()}
            </div>
            <div class="status-counts">
                {StatusClass::ALL
                    .iter()
                    .map(|status| {
                        let status = *status;
                        view! {
                            <span class=format!("status-count {}", status.as_str())>
                                {status.as_str()}": "{move || summary.get().status_counts.get(status)}
                            </span>
                        }
                    })
                    .collect_view()}
            </div>
        </div>
    }
}

/// カテゴリ別サマリー（フィルタ選択時のみ）
#[component]
pub fn CategorySummaryPanel(summary: CategorySummary) -> impl IntoView {
    view! {
        <div class=format!("category-summary {}", summary.filter.as_str())>
            <h3>{format!("{} Summary", summary.filter.label())}</h3>
            <p>"Images: "{summary.images}</p>
            <p>"Fruits: "{summary.total_fruits}</p>
            <p>{format!("Avg. Confidence: {:.1}%", summary.average_confidence)}</p>
            <p>"Confidence Range: "{summary.range_text()}</p>
        </div>
    }
}
