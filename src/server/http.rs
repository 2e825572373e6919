//! Route handlers for the HTTP explorer: a fixed `tiny_http` worker
//! pool, `(method, path)` match dispatch, and `respond_html`/
//! `html_escape` helpers, wired to the query engine and facet computer
//! instead of a gallery/DLNA surface.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::facets::{self, FacetResult, FacetSet};
use crate::query::{self, Filters, PhotoSummary, SortField};

use super::ServerState;

type HttpResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const HTTP_WORKERS: usize = 4;

pub fn run(server: tiny_http::Server, state: Arc<ServerState>) {
    let server = Arc::new(server);

    let workers: Vec<_> = (0..HTTP_WORKERS)
        .map(|i| {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            std::thread::Builder::new()
                .name(format!("photodex-http-{i}"))
                .spawn(move || loop {
                    if state.shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    let request = match server.recv_timeout(Duration::from_secs(1)) {
                        Ok(Some(req)) => req,
                        Ok(None) => continue,
                        Err(_) => break,
                    };

                    let url = request.url().to_string();
                    let method = request.method().to_string();
                    log::debug!("HTTP {method} {url}");

                    if let Err(e) = route(request, &method, &url, &state) {
                        log::debug!("HTTP response error: {e}");
                    }
                })
                .unwrap()
        })
        .collect();

    for w in workers {
        let _ = w.join();
    }
}

fn route(request: tiny_http::Request, method: &str, url: &str, state: &ServerState) -> HttpResult {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    if method != "GET" {
        return respond_status(request, 405, "Method Not Allowed");
    }

    match segments.as_slice() {
        [] => render_grid(request, state, query::parse_query_string(query)),
        ["photos"] => render_grid(request, state, query::parse_query_string(query)),
        ["thumbnail", id] => serve_thumbnail(request, state, id, query),
        ["photo", id] => render_detail(request, state, id),
        [y] if is_year(y) => render_grid(request, state, shortcut(query, |f| f.year = vec![y.parse().unwrap()])),
        [y, m] if is_year(y) => render_grid(
            request,
            state,
            shortcut(query, |f| {
                f.year = vec![y.parse().unwrap()];
                if let Ok(m) = m.parse() {
                    f.month = vec![m];
                }
            }),
        ),
        [y, m, d] if is_year(y) => render_grid(
            request,
            state,
            shortcut(query, |f| {
                f.year = vec![y.parse().unwrap()];
                if let Ok(m) = m.parse() {
                    f.month = vec![m];
                }
                if let Ok(d) = d.parse() {
                    f.day = vec![d];
                }
            }),
        ),
        ["camera", make] => {
            let make = query::percent_decode(make);
            render_grid(request, state, shortcut(query, |f| f.camera_make = vec![make.clone()]))
        }
        ["camera", make, model] => {
            let make = query::percent_decode(make);
            let model = query::percent_decode(model);
            render_grid(
                request,
                state,
                shortcut(query, |f| {
                    f.camera_make = vec![make.clone()];
                    f.camera_model = vec![model.clone()];
                }),
            )
        }
        ["lens", model] => {
            let model = query::percent_decode(model);
            render_grid(request, state, shortcut(query, |f| f.lens_model = vec![model.clone()]))
        }
        ["color", name] => {
            let name = query::percent_decode(name);
            render_grid(request, state, shortcut(query, |f| f.color = vec![name.clone()]))
        }
        ["bursts", id] => {
            let id = query::percent_decode(id);
            render_grid(request, state, shortcut(query, |f| f.burst_group_id = Some(id.clone())))
        }
        ["duplicates", type_or_id] => {
            let v = query::percent_decode(type_or_id);
            render_grid(
                request,
                state,
                shortcut(query, |f| {
                    if matches!(v.as_str(), "exact" | "near" | "similar") {
                        f.cluster_type = vec![v.clone()];
                    } else {
                        f.duplicate_cluster_id = Some(v.clone());
                    }
                }),
            )
        }
        _ => respond_status(request, 404, "Not Found"),
    }
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_digit())
}

/// Parse the current query string into a `Filters` record (picking up
/// pagination/sort), then apply a path-shortcut's dimension override on
/// top.
fn shortcut(query: &str, set: impl FnOnce(&mut Filters)) -> Filters {
    let mut f = query::parse_query_string(query);
    set(&mut f);
    f
}

/// Validate the filter dimensions the query-string grammar can express
/// malformed: an out-of-whitelist `sort` field, or a non-numeric value
/// in a numeric slot.
fn validate_query(query: &str) -> Result<(), String> {
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        let mut it = pair.splitn(2, '=');
        let key = it.next().unwrap_or("");
        let value = it.next().unwrap_or("");
        match key {
            "sort" if SortField::from_str(value).is_none() => {
                return Err(format!("unrecognised sort field: {value}"));
            }
            "iso_min" | "iso_max" | "offset" | "limit" if value.parse::<i64>().is_err() => {
                return Err(format!("{key} must be an integer, got {value:?}"));
            }
            "aperture_min" | "aperture_max" | "focal_length_min" | "focal_length_max"
            | "hue_min" | "hue_max" | "saturation_min" | "saturation_max" | "lightness_min"
            | "lightness_max" if value.parse::<f64>().is_err() => {
                return Err(format!("{key} must be a number, got {value:?}"));
            }
            _ => {}
        }
    }
    Ok(())
}

fn render_grid(request: tiny_http::Request, state: &ServerState, filters: Filters) -> HttpResult {
    let query = query::to_query_string(&filters);
    if let Err(reason) = validate_query(&query) {
        return respond_status(request, 400, &reason);
    }

    let catalog = Catalog::open(&state.catalogue_path)?;
    let (results, total) = query::search(&catalog, &filters)?;
    let facet_set = facets::compute_all(&catalog, &filters)?;

    let html = grid_page(&filters, &results, total, &facet_set);
    respond_html(request, html)
}

fn render_detail(request: tiny_http::Request, state: &ServerState, id: &str) -> HttpResult {
    let Ok(photo_id) = id.parse::<i64>() else {
        return respond_status(request, 400, "photo id must be an integer");
    };
    let catalog = Catalog::open(&state.catalogue_path)?;
    match catalog.photo_record(photo_id)? {
        Some(fields) => respond_html(request, detail_page(photo_id, &fields)),
        None => respond_status(request, 404, "Not Found"),
    }
}

fn serve_thumbnail(request: tiny_http::Request, state: &ServerState, id: &str, query: &str) -> HttpResult {
    let Ok(photo_id) = id.parse::<i64>() else {
        return respond_status(request, 400, "photo id must be an integer");
    };
    let size: u32 = query
        .split('&')
        .find_map(|p| p.strip_prefix("size="))
        .and_then(|s| s.parse().ok())
        .unwrap_or(256);

    let catalog = Catalog::open(&state.catalogue_path)?;
    let Some(bytes) = catalog.thumbnail(photo_id, size)? else {
        return respond_status(request, 404, "Not Found");
    };
    let indexed_at = catalog.photo_indexed_at(photo_id)?.unwrap_or_default();

    let response = tiny_http::Response::from_data(bytes)
        .with_header("Content-Type: image/jpeg".parse::<tiny_http::Header>().unwrap())
        .with_header(
            "Cache-Control: public, max-age=31536000, immutable"
                .parse::<tiny_http::Header>()
                .unwrap(),
        )
        .with_header(format!("ETag: \"{indexed_at}\"").parse::<tiny_http::Header>().unwrap());
    request.respond(response)?;
    Ok(())
}

fn respond_html(request: tiny_http::Request, html: String) -> HttpResult {
    let response = tiny_http::Response::from_string(html).with_header(
        "Content-Type: text/html; charset=utf-8"
            .parse::<tiny_http::Header>()
            .unwrap(),
    );
    request.respond(response)?;
    Ok(())
}

fn respond_status(request: tiny_http::Request, code: u16, message: &str) -> HttpResult {
    let response = tiny_http::Response::from_string(message).with_status_code(code);
    request.respond(response)?;
    Ok(())
}

const PAGE_STYLE: &str = "body { margin: 0; background: #1a1a1a; color: #ccc; font-family: system-ui, sans-serif; }
.layout { display: flex; }
.sidebar { width: 220px; flex-shrink: 0; padding: 12px; border-right: 1px solid #333; }
.sidebar h3 { font-size: 13px; text-transform: uppercase; color: #888; margin: 16px 0 4px; }
.sidebar a { color: #6af; text-decoration: none; }
.facet-value { display: flex; justify-content: space-between; font-size: 13px; padding: 2px 0; }
.facet-value.selected { color: #fff; font-weight: 600; }
.facet-value .count { color: #777; }
.main { flex: 1; padding: 12px; }
.header { padding-bottom: 12px; border-bottom: 1px solid #333; margin-bottom: 12px; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 4px; }
.grid a { display: block; aspect-ratio: 1; overflow: hidden; }
.grid img { width: 100%; height: 100%; object-fit: cover; display: block; }
.pages a { color: #6af; text-decoration: none; margin-right: 12px; }
table.detail { border-collapse: collapse; }
table.detail td { padding: 2px 10px; border-bottom: 1px solid #333; font-size: 13px; }
table.detail td:first-child { color: #888; }";

fn grid_page(filters: &Filters, results: &[PhotoSummary], total: u64, facet_set: &FacetSet) -> String {
    let mut thumbs = String::new();
    for photo in results {
        thumbs.push_str(&format!(
            r#"<a href="/photo/{id}"><img src="/thumbnail/{id}?size=256" loading="lazy"></a>"#,
            id = photo.id
        ));
    }

    let mut sidebar = String::new();
    for facet in &facet_set.facets {
        sidebar.push_str(&render_facet(facet));
    }
    if facet_set.truncated {
        sidebar.push_str("<p style=\"color:#a66\">Some facets were omitted (budget exceeded)</p>");
    }

    let mut pagination = String::new();
    if filters.offset > 0 {
        let mut prev = filters.clone();
        prev.offset = filters.offset.saturating_sub(filters.limit);
        pagination.push_str(&format!(r#"<a href="/photos?{}">&laquo; Prev</a>"#, query::to_query_string(&prev)));
    }
    if filters.offset as u64 + filters.limit as u64 < total {
        let mut next = filters.clone();
        next.offset += filters.limit;
        pagination.push_str(&format!(r#"<a href="/photos?{}">Next &raquo;</a>"#, query::to_query_string(&next)));
    }

    format!(
        r#"<!DOCTYPE html>
<html><head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>photodex</title>
<style>{PAGE_STYLE}</style>
</head><body>
<div class="layout">
<div class="sidebar">{sidebar}</div>
<div class="main">
<div class="header"><strong>{total}</strong> photos</div>
<div class="grid">{thumbs}</div>
<div class="pages">{pagination}</div>
</div>
</div>
</body></html>"#
    )
}

fn render_facet(facet: &FacetResult) -> String {
    match facet {
        FacetResult::Discrete { label, values, .. } => {
            if values.is_empty() {
                return String::new();
            }
            let mut out = format!("<h3>{}</h3>", html_escape(label));
            for v in values {
                if v.count == 0 && !v.selected {
                    continue;
                }
                let class = if v.selected { "facet-value selected" } else { "facet-value" };
                out.push_str(&format!(
                    r#"<div class="{class}"><a href="/photos?{url}">{value}</a><span class="count">{count}</span></div>"#,
                    url = v.url,
                    value = html_escape(&v.value),
                    count = v.count,
                ));
            }
            out
        }
        FacetResult::NumericRange { label, current_min, current_max, dataset_min, dataset_max, .. } => {
            format!(
                "<h3>{}</h3><div class=\"facet-value\">{}\u{2013}{} <span class=\"count\">(range {}\u{2013}{})</span></div>",
                html_escape(label),
                fmt_opt(*current_min, dataset_min.unwrap_or(0.0)),
                fmt_opt(*current_max, dataset_max.unwrap_or(0.0)),
                fmt_opt(*dataset_min, 0.0),
                fmt_opt(*dataset_max, 0.0),
            )
        }
        FacetResult::Boolean { label, selected, count_on, url_on, url_off, .. } => {
            let (url, other_label) = if *selected { (url_off, "off") } else { (url_on, "on") };
            format!(
                r#"<h3>{}</h3><div class="facet-value"><a href="/photos?{url}">turn {other_label}</a><span class="count">{count_on}</span></div>"#,
                html_escape(label)
            )
        }
    }
}

fn fmt_opt(v: Option<f64>, default: f64) -> String {
    format!("{:.0}", v.unwrap_or(default))
}

fn detail_page(id: i64, fields: &[(String, String)]) -> String {
    let mut rows = String::new();
    for (k, v) in fields {
        rows.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>", html_escape(k), html_escape(v)));
    }
    format!(
        r#"<!DOCTYPE html>
<html><head>
<meta charset="utf-8">
<title>photo {id}</title>
<style>{PAGE_STYLE}</style>
</head><body>
<div class="main">
<div class="header"><a href="/">&laquo; back</a> &mdash; photo {id}</div>
<img src="/thumbnail/{id}?size=1024" style="max-width: 100%;">
<table class="detail">{rows}</table>
</div>
</body></html>"#
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
