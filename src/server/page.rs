//! Single-page UI: measure recommendation, survey analysis, history sidebar

use axum::response::Html;

/// Handler for the index page
pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <title>Dropout Tracker</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            display: flex;
            background: #1a1a1a;
            color: #e0e0e0;
        }
        aside {
            width: 300px;
            min-height: 100vh;
            padding: 20px;
            background: #222;
            box-sizing: border-box;
        }
        main { flex: 1; max-width: 860px; padding: 20px; }
        h1 { color: #4CAF50; }
        .tabs button {
            background: #333;
            color: #e0e0e0;
            border: none;
            padding: 10px 16px;
            border-radius: 4px 4px 0 0;
            cursor: pointer;
        }
        .tabs button.active { background: #4CAF50; color: #111; }
        .panel { background: #2a2a2a; padding: 15px; border-radius: 0 8px 8px 8px; }
        .hidden { display: none; }
        label { display: block; margin: 10px 0 4px; }
        input, textarea, select { width: 100%; box-sizing: border-box; background: #333; color: #e0e0e0; border: 1px solid #444; padding: 6px; }
        button.primary { margin-top: 14px; background: #4CAF50; border: none; padding: 10px 18px; border-radius: 4px; cursor: pointer; }
        .section { margin-top: 18px; color: #4CAF50; font-weight: bold; }
        .measure { background: #333; padding: 8px; margin: 6px 0; border-radius: 4px; }
        .entry { background: #333; padding: 8px; margin: 8px 0; border-radius: 4px; font-size: 0.9em; }
        .error { color: #ff6b6b; }
        .metric { display: inline-block; margin-right: 24px; font-size: 1.2em; }
        pre { white-space: pre-wrap; background: #333; padding: 10px; border-radius: 4px; }
        a { color: #4CAF50; }
    </style>
</head>
<body>
    <aside>
        <h2>Improvement History</h2>
        <div id="history"><p>No history yet.</p></div>
        <p><a id="download" class="hidden" href="#">Download History</a></p>
    </aside>
    <main>
        <h1>Dropout Prevention Tracker</h1>
        <div class="tabs">
            <button id="tab-measures" class="active">Preventive Measures</button>
            <button id="tab-analysis">Analysis</button>
        </div>

        <div id="panel-measures" class="panel">
            <label for="rate">Current dropout rate (%)</label>
            <input id="rate" type="number" min="0" max="100" step="0.1" value="0">
            <label for="factors">Contributing factors</label>
            <textarea id="factors" rows="4"></textarea>
            <button class="primary" id="recommend">Get Recommendations</button>
            <div id="measures-out"></div>
        </div>

        <div id="panel-analysis" class="panel hidden">
            <div id="analysis-empty"><p>Request preventive measures first.</p></div>
            <form id="survey" class="hidden">
                <label for="measure">Implemented measure</label>
                <select id="measure"></select>
                <div id="questions"></div>
                <button class="primary" type="submit">Analyze Impact</button>
            </form>
            <div id="analysis-out"></div>
        </div>
    </main>

<script>
let sessionId = null;

async function api(path, options) {
    const res = await fetch(path, options);
    const body = await res.json().catch(() => ({}));
    if (res.status === 404 && body.error === 'Session not found') {
        sessionId = (await post('/api/sessions', {})).session_id;
        throw new Error('Session expired; a new one was started, please try again');
    }
    if (!res.ok) {
        throw new Error((body.error || res.statusText) + (body.details ? ': ' + body.details : ''));
    }
    return body;
}

function post(path, payload) {
    return api(path, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(payload)
    });
}

function escapeHtml(text) {
    const div = document.createElement('div');
    div.textContent = text;
    return div.innerHTML;
}

function showTab(name) {
    for (const tab of ['measures', 'analysis']) {
        document.getElementById('tab-' + tab).classList.toggle('active', tab === name);
        document.getElementById('panel-' + tab).classList.toggle('hidden', tab !== name);
    }
}

async function loadSurvey() {
    const catalog = await api('/api/survey');
    const container = document.getElementById('questions');
    let section = null;
    for (const q of catalog) {
        if (q.section !== section) {
            section = q.section;
            container.insertAdjacentHTML('beforeend', `<div class="section">${escapeHtml(section)}</div>`);
        }
        let input;
        if (q.kind.type === 'scale') {
            input = `<input type="range" min="1" max="10" value="5" name="${q.key}"
                oninput="this.nextElementSibling.textContent = this.value"><span>5</span>`;
        } else {
            input = `<select name="${q.key}"><option>True</option><option>False</option></select>`;
        }
        container.insertAdjacentHTML('beforeend', `<label>${escapeHtml(q.question)}</label>${input}`);
    }
    return catalog;
}

function fillMeasures(record) {
    const select = document.getElementById('measure');
    select.innerHTML = '';
    record.measures.forEach((m, i) => {
        const opt = document.createElement('option');
        opt.value = i;
        opt.textContent = m;
        select.appendChild(opt);
    });
    document.getElementById('analysis-empty').classList.add('hidden');
    document.getElementById('survey').classList.remove('hidden');
}

async function refreshHistory() {
    const items = await api(`/api/sessions/${sessionId}/history`);
    const box = document.getElementById('history');
    const link = document.getElementById('download');
    if (items.length === 0) {
        box.innerHTML = '<p>No history yet.</p>';
        link.classList.add('hidden');
        return;
    }
    box.innerHTML = items.map(e => `<div class="entry">
        <strong>${escapeHtml(e.title)}</strong><br>
        Date: ${escapeHtml(e.date)}<br>
        Initial Rate: ${e.initial_rate}<br>
        Final Rate: ${e.final_rate}<br>
        Change: ${e.rate_change}<br>
        Feedback: ${escapeHtml(e.feedback)}
    </div>`).join('');
    link.href = `/api/sessions/${sessionId}/history.csv`;
    link.classList.remove('hidden');
}

document.getElementById('tab-measures').onclick = () => showTab('measures');
document.getElementById('tab-analysis').onclick = () => showTab('analysis');

document.getElementById('recommend').onclick = async () => {
    const out = document.getElementById('measures-out');
    out.innerHTML = '<p>Generating recommendations...</p>';
    try {
        const record = await post(`/api/sessions/${sessionId}/measures`, {
            rate: parseFloat(document.getElementById('rate').value) || 0,
            factors: document.getElementById('factors').value
        });
        out.innerHTML = '<h3>Recommended Measures</h3>' +
            record.measures.map(m => `<div class="measure">${escapeHtml(m)}</div>`).join('');
        fillMeasures(record);
    } catch (e) {
        out.innerHTML = `<p class="error">${escapeHtml(e.message)}</p>`;
    }
};

document.getElementById('survey').onsubmit = async (event) => {
    event.preventDefault();
    const form = event.target;
    const survey = {};
    for (const el of form.querySelectorAll('[name]')) {
        survey[el.name] = el.type === 'range' ? parseInt(el.value, 10) : el.value;
    }
    const out = document.getElementById('analysis-out');
    out.innerHTML = '<p>Analyzing impact...</p>';
    try {
        const a = await post(`/api/sessions/${sessionId}/analyze`, {
            measure_index: parseInt(document.getElementById('measure').value, 10),
            survey
        });
        const s = a.score;
        let html = `<h3>Impact Analysis</h3>
            <div class="metric">Initial Rate: ${s.initial_rate.toFixed(1)}%</div>
            <div class="metric">New Rate: ${s.new_rate.toFixed(1)}% (${s.direction}${s.rate_change.toFixed(1)}%)</div>
            <p>Status: ${s.status}</p>
            <p>${escapeHtml(s.feedback)}</p>`;
        if (a.report) {
            html += `<pre>${escapeHtml(a.report)}</pre>`;
        } else {
            html += `<p class="error">Report unavailable: ${escapeHtml(a.report_error || '')}</p>`;
        }
        out.innerHTML = html;
        await refreshHistory();
    } catch (e) {
        out.innerHTML = `<p class="error">${escapeHtml(e.message)}</p>`;
    }
};

(async () => {
    await loadSurvey();
    sessionId = (await post('/api/sessions', {})).session_id;
    await refreshHistory();
})();
</script>
</body>
</html>"##;
