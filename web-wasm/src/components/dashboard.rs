//! ダッシュボードページ
//!
//! 状態は `DashboardState` 1つにまとめ、各コンポーネントには派生シグナルで渡す。

use super::assessment_grid::{AssessmentGrid, DetailModal};
use super::filter_bar::FilterBar;
use super::notifications::use_notifier;
use super::summary_panel::{CategorySummaryPanel, SummaryPanel};
use crate::api::server;
use crate::export::download_text;
use gloo::events::EventListener;
use gloo::timers::callback::Interval;
use kaong_common::dashboard::{DashboardState, POLL_INTERVAL_MS};
use kaong_common::export::report_file_name;
use kaong_common::notify::Notification;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn DashboardPage() -> impl IntoView {
    let notifier = use_notifier();
    let state = RwSignal::new(DashboardState::default());
    let (is_loading, set_is_loading) = signal(false);
    let (selected, set_selected) = signal(None::<i64>);

    // 後から発行した再読み込みが勝つ（古い応答は捨てる）
    let reload = move || {
        let Some(token) = state.try_update(|s| s.begin_reload()) else {
            return;
        };
        set_is_loading.set(true);
        spawn_local(async move {
            let response = server::fetch_assessments().await;
            let Some(outcome) = state.try_update(|s| s.finish_reload(token, response)) else {
                return;
            };
            if let Some(notification) = outcome.notification() {
                notifier.push(notification);
            }
            if outcome.settles_loading() {
                set_is_loading.try_set(false);
            }
        });
    };

    reload();

    let poller = StoredValue::new_local(Some(Interval::new(POLL_INTERVAL_MS, reload)));
    let visibility = StoredValue::new_local(web_sys::window().and_then(|w| w.document()).map(|document| {
        let target = document.clone();
        EventListener::new(&target, "visibilitychange", move |_| {
            // 再表示されたときだけ読み込み直す
            if !document.hidden() {
                reload();
            }
        })
    }));
    on_cleanup(move || {
        poller.update_value(|p| {
            p.take();
        });
        visibility.update_value(|v| {
            v.take();
        });
    });

    let on_delete = move |id: i64| {
        let confirmed = web_sys::window()
            .and_then(|w| {
                w.confirm_with_message(
                    "Are you sure you want to delete this assessment? This action cannot be undone.",
                )
                .ok()
            })
            .unwrap_or(false);
        if !confirmed {
            return;
        }

        spawn_local(async move {
            let response = server::delete_assessment(id).await;
            let Some(outcome) = state.try_update(|s| s.finish_delete(id, response)) else {
                return;
            };
            notifier.push(outcome.notification());
            if outcome.needs_reload() {
                set_selected.try_set(None);
                reload();
            }
        });
    };

    let on_export = move |_| {
        let result = state.with_untracked(|s| s.export_csv().map(|csv| (csv, s.records().len())));
        match result {
            Ok((csv, count)) => {
                let file_name = report_file_name(today());
                match download_text(&csv, &file_name, "text/csv;charset=utf-8;") {
                    Ok(()) => notifier.push(Notification::success(format!(
                        "Report exported successfully! {} records exported.",
                        count
                    ))),
                    Err(e) => {
                        log::error!("Error exporting report: {}", e);
                        notifier.push(Notification::error("Error exporting report. Please try again."));
                    }
                }
            }
            Err(e) => notifier.push(Notification::error(e.to_string())),
        }
    };

    let summary = Signal::derive(move || state.with(|s| s.summary()));
    let filter = Signal::derive(move || state.with(|s| s.filter()));
    let threshold = Signal::derive(move || state.with(|s| s.threshold()));
    let sort = Signal::derive(move || state.with(|s| s.sort()));
    let cards = Signal::derive(move || state.with(|s| s.visible_cards()));

    view! {
        <section class="dashboard">
            <SummaryPanel summary=summary />

            <FilterBar
                filter=filter
                threshold=threshold
                sort=sort
                is_loading=is_loading
                on_filter=move |f| state.update(|s| s.set_filter(f))
                on_threshold=move |t| state.update(|s| s.set_threshold(t))
                on_sort_key=move |k| state.update(|s| s.set_sort_key(k))
                on_toggle_order=move |_| state.update(|s| {
                    s.toggle_sort_order();
                })
                on_refresh=move |_| reload()
                on_export=on_export
            />

            <p class="filter-status">{move || state.with(|s| s.filter_status_text())}</p>
            <p class="confidence-info">{move || state.with(|s| s.confidence_info())}</p>

            {move || state.with(|s| s.category_summary()).map(|summary| view! {
                <CategorySummaryPanel summary=summary />
            })}

            <AssessmentGrid
                cards=cards
                on_open=move |id| set_selected.set(Some(id))
                on_delete=on_delete
            />

            {move || {
                let id = selected.get()?;
                let record = state.with(|s| s.records().iter().find(|r| r.id == id).cloned())?;
                Some(view! { <DetailModal record=record on_close=move |_| set_selected.set(None) /> })
            }}
        </section>
    }
}

/// ブラウザの現在日付（ローカル時刻）
fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
