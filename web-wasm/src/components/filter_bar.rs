//! フィルタ・しきい値・並び替え・エクスポート

use kaong_common::dashboard::{SortKey, SortOrder, SortSpec};
use kaong_common::Filter;
use leptos::prelude::*;

#[component]
pub fn FilterBar<FF, FT, FK, FO, FR, FE>(
    filter: Signal<Filter>,
    threshold: Signal<u8>,
    sort: Signal<Option<SortSpec>>,
    is_loading: ReadSignal<bool>,
    on_filter: FF,
    on_threshold: FT,
    on_sort_key: FK,
    on_toggle_order: FO,
    on_refresh: FR,
    on_export: FE,
) -> impl IntoView
where
    FF: Fn(Filter) + 'static + Clone + Send,
    FT: Fn(i32) + 'static + Clone + Send + Sync,
    FK: Fn(SortKey) + 'static + Clone,
    FO: Fn(()) + 'static + Clone,
    FR: Fn(()) + 'static + Clone,
    FE: Fn(()) + 'static + Clone,
{
    let order = move || sort.get().map(|s| s.order).unwrap_or_default();

    view! {
        <div class="filter-bar">
            <div class="filter-buttons">
                {Filter::ALL
                    .iter()
                    .map(|f| {
                        let f = *f;
                        let on_filter = on_filter.clone();
                        view! {
                            <button
                                class=format!("filter-btn {}", f.as_str())
                                class:active=move || filter.get() == f
                                on:click=move |_| on_filter(f)
                            >
                                {f.label()}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>

            <Show when=move || filter.get().applies_threshold()>
                <div class="confidence-filter">
                    <label for="confidence-threshold">
                        {move || format!("Min. Confidence: {}%", threshold.get())}
                    </label>
                    <input
                        type="range"
                        id="confidence-threshold"
                        min="0"
                        max="100"
                        prop:value=move || threshold.get().to_string()
                        on:input={
                            let on_threshold = on_threshold.clone();
                            move |ev| {
                                if let Ok(value) = event_target_value(&ev).parse::<i32>() {
                                    on_threshold(value);
                                }
                            }
                        }
                    />
                </div>
            </Show>

            <div class="sort-controls">
                <select
                    id="sort-select"
                    on:change={
                        let on_sort_key = on_sort_key.clone();
                        move |ev| {
                            if let Ok(key) = event_target_value(&ev).parse::<SortKey>() {
                                on_sort_key(key);
                            }
                        }
                    }
                >
                    <option value="" disabled=true selected=move || sort.get().is_none()>"Sort by..."</option>
                    <option value="date">"Date"</option>
                    <option value="confidence">"Confidence"</option>
                    <option value="count">"Fruit Count"</option>
                </select>
                <button
                    class="btn btn-small"
                    title=move || match order() {
                        SortOrder::Asc => "Ascending",
                        SortOrder::Desc => "Descending",
                    }
                    on:click={
                        let on_toggle_order = on_toggle_order.clone();
                        move |_| on_toggle_order(())
                    }
                >
                    {move || order().symbol()}
                </button>
            </div>

            <div class="dashboard-actions">
                <button
                    class="btn btn-secondary"
                    disabled=move || is_loading.get()
                    on:click={
                        let on_refresh = on_refresh.clone();
                        move |_| on_refresh(())
                    }
                >
                    {move || if is_loading.get() { "Loading..." } else { "Refresh" }}
                </button>
                <button
                    class="btn btn-primary"
                    on:click={
                        let on_export = on_export.clone();
                        move |_| on_export(())
                    }
                >
                    "Export CSV"
                </button>
            </div>
        </div>
    }
}
