//! 検出結果の詳細パネル

use kaong_common::capture::DetailsPanel;
use kaong_common::Category;
use leptos::prelude::*;

#[component]
pub fn DetailsPanelView<F>(details: DetailsPanel, on_close: F) -> impl IntoView
where
    F: Fn() + 'static,
{
    let summary = details.summary_text();
    let summary = if summary.is_empty() { "No detections".to_string() } else { summary };
    let breakdown = details.breakdown();

    view! {
        <div class="details-panel">
            <div class="details-header">
                <h3>"Detection Details"</h3>
                <button class="close-btn" on:click=move |_| on_close()>"×"</button>
            </div>
            <p class="details-timestamp">{details.timestamp.clone()}</p>
            <p class="details-confidence">"Confidence: "{details.confidence_text()}</p>
            <p class="details-source">"Source: "{details.source.label()}</p>
            <div class="breakdown">
                {Category::ALL
                    .iter()
                    .zip(breakdown)
                    .map(|(category, percent)| {
                        let count = details.counts.get(*category);
                        view! {
                            <div class="breakdown-row">
                                <span class="breakdown-label">{format!("{}: {}", category.as_str(), count)}</span>
                                <div class="breakdown-bar">
                                    <div
                                        class=format!("breakdown-fill {}", category.as_str().to_lowercase())
                                        style=format!("width: {:.1}%", percent)
                                    ></div>
                                </div>
                            </div>
                        }
                    })
                    .collect_view()}
            </div>
            <p class="details-summary">{summary}</p>
        </div>
    }
}
