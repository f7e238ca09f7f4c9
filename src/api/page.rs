// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server-rendered page for the browser UI
//!
//! A single HTML document with a login form, an upload form and the
//! prediction history. All actions go through the JSON API.

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Chest X-ray Classifier</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; color: #1f2933; }
  section { border: 1px solid #d9e2ec; border-radius: 8px; padding: 1rem 1.25rem; margin-bottom: 1.25rem; }
  label { display: block; margin: .5rem 0 .25rem; }
  input[type=email], input[type=password] { width: 100%; padding: .4rem; box-sizing: border-box; }
  button { margin-top: .75rem; padding: .4rem 1rem; }
  .success { color: #0f7b3f; }
  .error { color: #b42318; }
  .hidden { display: none; }
  #preview { max-width: 100%; max-height: 360px; margin-top: .75rem; }
  table { width: 100%; border-collapse: collapse; }
  td, th { text-align: left; padding: .25rem .5rem; border-bottom: 1px solid #e4e7eb; }
</style>
</head>
<body>
<h1>Chest X-ray Classifier</h1>

<section id="login" data-required="{{REQUIRE_LOGIN}}">
  <h2>Firebase Login</h2>
  <form id="login-form">
    <label for="email">Email</label>
    <input id="email" type="email" autocomplete="username" required>
    <label for="password">Password</label>
    <input id="password" type="password" autocomplete="current-password" required>
    <button type="submit">Login</button>
    <button type="button" id="signup">Sign up</button>
    <button type="button" id="logout" class="hidden">Logout</button>
  </form>
  <p id="login-status"></p>
</section>

<section id="analyze">
  <h2>Upload an X-ray</h2>
  <form id="upload-form">
    <input id="image" name="image" type="file" accept="image/png,image/jpeg,image/bmp,image/gif,image/webp,image/tiff" required>
    <button type="submit">Analyze</button>
  </form>
  <img id="preview" class="hidden" alt="Uploaded X-ray">
  <p id="result"></p>
</section>

<section id="history" class="{{HISTORY_CLASS}}">
  <h2>Recent predictions</h2>
  <button type="button" id="refresh">Refresh</button>
  <table>
    <thead><tr><th>File</th><th>Prediction</th><th>Confidence</th><th>Time (UTC)</th></tr></thead>
    <tbody id="history-rows"></tbody>
  </table>
</section>

<script>
const loginRequired = document.getElementById('login').dataset.required === 'true';
let token = sessionStorage.getItem('sessionToken');

function authHeaders() {
  return token ? { 'Authorization': 'Bearer ' + token } : {};
}

function setStatus(el, text, ok) {
  el.textContent = text;
  el.className = ok ? 'success' : 'error';
}

function refreshLoginState(email) {
  document.getElementById('logout').classList.toggle('hidden', !token);
  if (token && email) {
    setStatus(document.getElementById('login-status'), 'Login successful! Signed in as ' + email, true);
  }
}

async function credentials(path) {
  const status = document.getElementById('login-status');
  const body = {
    email: document.getElementById('email').value,
    password: document.getElementById('password').value,
  };
  const res = await fetch(path, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  const data = await res.json();
  if (!res.ok) {
    setStatus(status, 'Error: ' + data.message, false);
    return;
  }
  token = data.sessionToken;
  sessionStorage.setItem('sessionToken', token);
  sessionStorage.setItem('email', data.email);
  refreshLoginState(data.email);
  loadHistory();
}

document.getElementById('login-form').addEventListener('submit', (e) => {
  e.preventDefault();
  credentials('/v1/auth/login');
});

document.getElementById('signup').addEventListener('click', () => credentials('/v1/auth/signup'));

document.getElementById('logout').addEventListener('click', async () => {
  await fetch('/v1/auth/logout', { method: 'POST', headers: authHeaders() });
  token = null;
  sessionStorage.clear();
  refreshLoginState();
  setStatus(document.getElementById('login-status'), 'Logged out', true);
});

document.getElementById('image').addEventListener('change', (e) => {
  const file = e.target.files[0];
  const preview = document.getElementById('preview');
  if (file) {
    preview.src = URL.createObjectURL(file);
    preview.classList.remove('hidden');
  }
});

document.getElementById('upload-form').addEventListener('submit', async (e) => {
  e.preventDefault();
  const result = document.getElementById('result');
  if (loginRequired && !token) {
    setStatus(result, 'Please log in first.', false);
    return;
  }
  const file = document.getElementById('image').files[0];
  if (!file) {
    return;
  }
  const form = new FormData();
  form.append('image', file, file.name);
  result.className = '';
  result.textContent = 'Analyzing...';
  const res = await fetch('/v1/analyze', { method: 'POST', headers: authHeaders(), body: form });
  const data = await res.json();
  if (!res.ok) {
    setStatus(result, 'Error: ' + data.message, false);
    return;
  }
  let text = 'Prediction: ' + data.label + ' (' + (data.confidence * 100).toFixed(1) + '% confidence)';
  if (data.imageUrl) {
    text += '. Saved to ' + data.imageUrl;
  }
  setStatus(result, text, true);
  loadHistory();
});

async function loadHistory() {
  const section = document.getElementById('history');
  if (section.classList.contains('hidden') || (loginRequired && !token)) {
    return;
  }
  const res = await fetch('/v1/predictions?limit=20', { headers: authHeaders() });
  if (!res.ok) {
    return;
  }
  const data = await res.json();
  const rows = document.getElementById('history-rows');
  rows.replaceChildren();
  for (const p of data.predictions) {
    const tr = document.createElement('tr');
    for (const value of [p.fileName, p.label, (p.confidence * 100).toFixed(1) + '%', p.timestamp]) {
      const td = document.createElement('td');
      td.textContent = value;
      tr.appendChild(td);
    }
    rows.appendChild(tr);
  }
}

document.getElementById('refresh').addEventListener('click', loadHistory);

if (!loginRequired) {
  document.getElementById('login').classList.add('hidden');
}
refreshLoginState(sessionStorage.getItem('email'));
loadHistory();
</script>
</body>
</html>
"#;

/// The index page for the given settings
pub fn render_index(require_login: bool, persist_predictions: bool) -> String {
    TEMPLATE
        .replace("{{REQUIRE_LOGIN}}", if require_login { "true" } else { "false" })
        .replace(
            "{{HISTORY_CLASS}}",
            if persist_predictions { "" } else { "hidden" },
        )
}
