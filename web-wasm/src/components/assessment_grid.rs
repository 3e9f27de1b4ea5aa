//! 判定レコードのカード一覧と詳細モーダル

use kaong_common::{AssessmentRecord, CardView, Category, CategoryCounts};
use leptos::prelude::*;

/// カードの再描画キー（表示内容が変わったら作り直す）
fn card_key(card: &CardView) -> String {
    format!("{}:{}:{}:{}", card.id, card.dimmed, card.confidence_text, card.image_url)
}

#[component]
pub fn AssessmentGrid<FO, FD>(cards: Signal<Vec<CardView>>, on_open: FO, on_delete: FD) -> impl IntoView
where
    FO: Fn(i64) + 'static + Clone + Send + Sync,
    FD: Fn(i64) + 'static + Clone + Send + Sync,
{
    view! {
        <Show
            when=move || !cards.get().is_empty()
            fallback=|| view! { <p class="no-data">"No assessments match the current filter"</p> }
        >
            <div class="assessment-grid">
                <For
                    each=move || cards.get()
                    key=card_key
                    children={
                        let on_open = on_open.clone();
                        let on_delete = on_delete.clone();
                        move |card| {
                            let on_open = on_open.clone();
                            let on_delete = on_delete.clone();
                            view! { <AssessmentCard card=card on_open=on_open on_delete=on_delete /> }
                        }
                    }
                />
            </div>
        </Show>
    }
}

#[component]
fn AssessmentCard<FO, FD>(card: CardView, on_open: FO, on_delete: FD) -> impl IntoView
where
    FO: Fn(i64) + 'static + Clone + Send + Sync,
    FD: Fn(i64) + 'static + Clone + Send + Sync,
{
    let id = card.id;
    let [ripe, unripe, rotten] = card.breakdown;

    view! {
        <div
            class=format!("assessment-card {}", card.status.as_str())
            class:dimmed=card.dimmed
            on:click=move |_| on_open(id)
        >
            <img src=card.image_url.clone() alt="Kaong assessment" loading="lazy" />
            <div class="card-body">
                <h4>{card.assessment.clone()}</h4>
                <span class=format!("confidence-badge {}", card.confidence_class.as_str())>
                    {card.confidence_text.clone()}
                </span>
                <div class="breakdown-bar">
                    <div class="bar ripe" style=format!("width: {}%", ripe) />
                    <div class="bar unripe" style=format!("width: {}%", unripe) />
                    <div class="bar rotten" style=format!("width: {}%", rotten) />
                </div>
                <p class="card-summary">{card.summary_text.clone()}</p>
                <p class="card-meta">{card.timestamp_text.clone()}" · "{card.source.clone()}</p>
                <button
                    class="btn btn-small btn-danger"
                    on:click=move |ev| {
                        ev.stop_propagation();
                        on_delete(id);
                    }
                >
                    "Delete"
                </button>
            </div>
        </div>
    }
}

/// 1カテゴリ分の画像（あれば）
fn category_images(record: &AssessmentRecord) -> Vec<(Category, String)> {
    Category::ALL
        .iter()
        .filter_map(|c| record.category_image_url(*c).map(|url| (*c, url.to_string())))
        .collect()
}

#[component]
pub fn DetailModal<FC>(record: AssessmentRecord, on_close: FC) -> impl IntoView
where
    FC: Fn(()) + 'static + Clone,
{
    let counts = kaong_common::parse_counts(&record.assessment);
    let detected = record
        .detection_data
        .as_ref()
        .map(|d| CategoryCounts::from_detections(&d.detections));
    let timestamp = record
        .parsed_timestamp()
        .map(|ts| kaong_common::types::format_timestamp(&ts))
        .unwrap_or_else(|| "Invalid Date".to_string());
    let extra_images = category_images(&record);

    view! {
        <div class="modal-backdrop" on:click={
            let on_close = on_close.clone();
            move |_| on_close(())
        }>
            <div class="modal" on:click=|ev| ev.stop_propagation()>
                <button class="modal-close" on:click=move |_| on_close(())>"×"</button>
                <img class="modal-image" src=record.image_url.clone() alt="Kaong assessment" />
                <h3>{record.assessment.clone()}</h3>
                <p>{format!("Confidence: {:.1}%", record.confidence_percent())}</p>
                <p>"Timestamp: "{timestamp}</p>
                <p>"Source: "{record.source.clone()}</p>
                <p>"Breakdown: "{counts.breakdown_text()}</p>
                {detected.map(|d| view! { <p>"Stored detections: "{d.breakdown_text()}</p> })}
                <div class="category-images">
                    {extra_images
                        .into_iter()
                        .map(|(category, url)| view! {
                            <figure>
                                <img src=url alt=category.as_str() />
                                <figcaption>{category.as_str()}</figcaption>
                            </figure>
                        })
                        .collect_view()}
                </div>
            </div>
        </div>
    }
}
