//! Interactive HTML charts of a trained topic model (plotly.js figures)

use crate::error::Result;
use crate::topics::linkage::Linkage;
use crate::topics::model::{TopicModel, TopicSummary};
use crate::topics::pca::Pca;
use crate::topics::similarity::{cosine_similarity, sparse_cosine_matrix};
use askama::Template;
use log::info;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const DISTANCE_MAP_FILE: &str = "bert_topic_model_distance_model.html";
pub const HIERARCHY_FILE: &str = "bert_topic_model_hierarchical_clustering.html";
pub const WORD_SCORES_FILE: &str = "bert_topic_model_word_scores.html";
pub const HEATMAP_FILE: &str = "bert_topic_model_word_heatmap.html";

const BARCHART_COLUMNS: usize = 4;

/// One chart page; `figure` is a plotly `{data, layout}` object
#[derive(Template)]
#[template(source = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }}</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #ffffff;
        }
        h1 {
            font-size: 20px;
            color: #333;
        }
        .meta {
            color: #6c757d;
            font-size: 13px;
        }
    </style>
</head>
<body>
    <h1>{{ title }}</h1>
    <p class="meta">{{ n_topics }} topics, model {{ model_name }}</p>
    <div id="chart"></div>
    <script>
        var figure = {{ figure|safe }};
        Plotly.newPlot("chart", figure.data, figure.layout, {responsive: true});
    </script>
</body>
</html>"#, ext = "html")]
struct ChartPage<'a> {
    title: &'a str,
    n_topics: usize,
    model_name: &'a str,
    figure: String,
}

/// Write the four chart pages into `output_dir` and return their paths
pub fn write_visualizations(model: &TopicModel, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let topics: Vec<&TopicSummary> = model.topic_info().iter().filter(|t| t.id >= 0).collect();

    let charts = [
        (DISTANCE_MAP_FILE, "Intertopic Distance Map", distance_map(model, &topics)),
        (HIERARCHY_FILE, "Hierarchical Clustering", hierarchy(model, &topics)),
        (
            WORD_SCORES_FILE,
            "Topic Word Scores",
            word_scores(
                &topics,
                model.settings().topics.barchart_topics,
                model.settings().topics.barchart_words,
            ),
        ),
        (HEATMAP_FILE, "Similarity Matrix", heatmap(model, &topics)),
    ];

    let mut written = Vec::with_capacity(charts.len());
    for (file, title, figure) in charts {
        let page = ChartPage {
            title,
            n_topics: topics.len(),
            model_name: &model.settings().embedding_model,
            figure: script_safe(&figure),
        };
        let path = output_dir.join(file);
        std::fs::write(&path, page.render()?)?;
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// JSON that cannot close the surrounding script element
fn script_safe(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn topic_embeddings(model: &TopicModel, topics: &[&TopicSummary]) -> Vec<Vec<f32>> {
    let dim = model
        .topic_embeddings()
        .values()
        .next()
        .map(Vec::len)
        .unwrap_or(0);
    topics
        .iter()
        .map(|t| {
            model
                .topic_embeddings()
                .get(&t.id)
                .cloned()
                .unwrap_or_else(|| vec![0.0; dim])
        })
        .collect()
}

/// Topics placed by the first two principal components of their embeddings,
/// bubble area proportional to topic size
fn distance_map(model: &TopicModel, topics: &[&TopicSummary]) -> Value {
    let embeddings = topic_embeddings(model, topics);
    let coords: Vec<(f32, f32)> = Pca::fit_transform(&embeddings, 2)
        .into_iter()
        .map(|p| (p.first().copied().unwrap_or(0.0), p.get(1).copied().unwrap_or(0.0)))
        .collect();

    let max_count = topics.iter().map(|t| t.count).max().unwrap_or(1).max(1) as f64;
    let sizes: Vec<f64> = topics
        .iter()
        .map(|t| 10.0 + 50.0 * (t.count as f64 / max_count).sqrt())
        .collect();
    let hover: Vec<String> = topics
        .iter()
        .map(|t| format!("Topic {}<br>{}<br>Size: {}", t.id, t.words().join(" | "), t.count))
        .collect();

    json!({
        "data": [{
            "type": "scatter",
            "mode": "markers+text",
            "x": coords.iter().map(|c| c.0).collect::<Vec<_>>(),
            "y": coords.iter().map(|c| c.1).collect::<Vec<_>>(),
            "text": topics.iter().map(|t| t.id.to_string()).collect::<Vec<_>>(),
            "hovertext": hover,
            "hoverinfo": "text",
            "marker": {
                "size": sizes,
                "color": "#B0BEC5",
                "line": {"width": 2, "color": "DarkSlateGrey"},
                "opacity": 0.8
            }
        }],
        "layout": {
            "height": 650,
            "width": 650,
            "showlegend": false,
            "xaxis": {"title": "D1", "zeroline": true},
            "yaxis": {"title": "D2", "zeroline": true}
        }
    })
}

/// Dendrogram of average linkage on c-TF-IDF cosine distance
fn hierarchy(model: &TopicModel, topics: &[&TopicSummary]) -> Value {
    let rows: Vec<_> = topics
        .iter()
        .map(|t| model.topic_rows().get(&t.id).cloned().unwrap_or_default())
        .collect();
    let distances: Vec<Vec<f64>> = sparse_cosine_matrix(&rows)
        .into_iter()
        .map(|row| row.into_iter().map(|sim| (1.0 - sim).max(0.0)).collect())
        .collect();
    let linkage = Linkage::average(&distances);

    let order = linkage.leaf_order();
    let n = linkage.n_leaves;
    // node id -> (x, height)
    let mut position = vec![(0.0f64, 0.0f64); n + linkage.steps.len()];
    for (slot, &leaf) in order.iter().enumerate() {
        position[leaf] = (5.0 + 10.0 * slot as f64, 0.0);
    }

    let mut traces: Vec<Value> = Vec::with_capacity(linkage.steps.len());
    for (i, step) in linkage.steps.iter().enumerate() {
        let (xl, yl) = position[step.left];
        let (xr, yr) = position[step.right];
        position[n + i] = ((xl + xr) / 2.0, step.distance);
        traces.push(json!({
            "type": "scatter",
            "mode": "lines",
            "x": [xl, xl, xr, xr],
            "y": [yl, step.distance, step.distance, yr],
            "line": {"color": "#636EFA"},
            "hoverinfo": "y",
            "showlegend": false
        }));
    }

    let tick_values: Vec<f64> = (0..order.len()).map(|slot| 5.0 + 10.0 * slot as f64).collect();
    let tick_text: Vec<&str> = order.iter().map(|&leaf| topics[leaf].name.as_str()).collect();
    json!({
        "data": traces,
        "layout": {
            "height": 600,
            "width": (200 + 40 * n).max(800),
            "showlegend": false,
            "hovermode": "closest",
            "xaxis": {"tickmode": "array", "tickvals": tick_values, "ticktext": tick_text, "tickangle": -45},
            "yaxis": {"title": "Distance", "rangemode": "tozero"}
        }
    })
}

/// Horizontal keyword bar charts for the largest topics
fn word_scores(topics: &[&TopicSummary], max_topics: usize, n_words: usize) -> Value {
    let shown: Vec<&&TopicSummary> = topics.iter().take(max_topics).collect();
    let rows = shown.len().div_ceil(BARCHART_COLUMNS).max(1);

    let traces: Vec<Value> = shown
        .iter()
        .enumerate()
        .map(|(i, topic)| {
            // smallest bar on top reads best in a horizontal chart
            let words: Vec<&(String, f64)> = topic.keywords.iter().take(n_words).rev().collect();
            let axis = if i == 0 { String::new() } else { (i + 1).to_string() };
            json!({
                "type": "bar",
                "orientation": "h",
                "name": format!("Topic {}", topic.id),
                "x": words.iter().map(|(_, score)| score).collect::<Vec<_>>(),
                "y": words.iter().map(|(word, _)| format!("{}  ", word)).collect::<Vec<_>>(),
                "xaxis": format!("x{}", axis),
                "yaxis": format!("y{}", axis),
                "showlegend": false
            })
        })
        .collect();

    let annotations: Vec<Value> = shown
        .iter()
        .enumerate()
        .map(|(i, topic)| {
            let axis = if i == 0 { String::new() } else { (i + 1).to_string() };
            json!({
                "text": format!("Topic {}", topic.id),
                "xref": format!("x{} domain", axis),
                "yref": format!("y{} domain", axis),
                "x": 0.5,
                "y": 1.15,
                "showarrow": false
            })
        })
        .collect();

    json!({
        "data": traces,
        "layout": {
            "grid": {"rows": rows, "columns": BARCHART_COLUMNS, "pattern": "independent", "ygap": 0.4},
            "height": 250 * rows,
            "width": 1000,
            "annotations": annotations,
            "showlegend": false
        }
    })
}

/// Cosine similarity of topic embeddings
fn heatmap(model: &TopicModel, topics: &[&TopicSummary]) -> Value {
    let embeddings = topic_embeddings(model, topics);
    let z: Vec<Vec<f32>> = embeddings
        .iter()
        .map(|a| embeddings.iter().map(|b| cosine_similarity(a, b)).collect())
        .collect();
    let labels: Vec<&str> = topics.iter().map(|t| t.name.as_str()).collect();

    json!({
        "data": [{
            "type": "heatmap",
            "z": z,
            "x": labels,
            "y": labels,
            "colorscale": "GnBu",
            "zmin": 0.0,
            "zmax": 1.0
        }],
        "layout": {
            "height": (300 + 25 * topics.len()).max(600),
            "width": (300 + 25 * topics.len()).max(600),
            "xaxis": {"showticklabels": topics.len() <= 50},
            "yaxis": {"showticklabels": topics.len() <= 50, "autorange": "reversed"}
        }
    })
}
