//! Static pages for the two routes. The form page drives the session API.

pub const LANDING_PAGE: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Start a project</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 4rem auto; }
a.button { background: #10b981; color: #fff; padding: .75rem 1.5rem; border-radius: .5rem; text-decoration: none; }
</style>
</head>
<body>
<h1>Launch your online store</h1>
<p>Tell us about your project: name, colors, navigation and the sections you need.</p>
<p><a class="button" href="/form">Start your project</a></p>
</body>
</html>
"##;

pub const FORM_PAGE: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>New project</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
label { display: block; margin-top: 1rem; }
.error { color: #b91c1c; font-size: .9rem; }
.notice { padding: 1rem; margin: 1rem 0; border-radius: .5rem; }
.notice.success { background: #d1fae5; }
.notice.failed { background: #fee2e2; }
</style>
</head>
<body>
<h1>New project</h1>
<div id="notice"></div>
<form id="form">
  <label>Project name <input name="projectName"></label><div class="error" data-for="projectName"></div>
  <label>Description <textarea name="projectDescription"></textarea></label><div class="error" data-for="projectDescription"></div>
  <label>Logo URL <input name="logoUrl"></label><div class="error" data-for="logoUrl"></div>
  <label>Project type <select name="projectType" id="projectType"></select></label>
  <fieldset><legend>Colors</legend>
    <input type="color" name="primaryColor"> <input type="color" name="secondaryColor"> <input type="color" name="accentColor">
    <div id="palettes"></div>
  </fieldset>
  <fieldset><legend>Navigation</legend><div id="links"></div><button type="button" id="add-link">Add link</button></fieldset>
  <fieldset><legend>Sections</legend><div id="sections"></div></fieldset>
  <button type="submit" id="submit">Submit</button>
</form>
<script>
let session = null;
const api = (method, path, body) => fetch(`/api/sessions/${session}${path}`, {
  method, headers: { "content-type": "application/json" },
  body: body === undefined ? undefined : JSON.stringify(body),
}).then(async (r) => ({ ok: r.ok, body: await r.json() }));

function render(s) {
  const form = document.getElementById("form");
  for (const name of ["projectName", "projectDescription", "logoUrl", "projectType", "primaryColor", "secondaryColor", "accentColor"]) {
    if (document.activeElement !== form.elements[name]) form.elements[name].value = s.draft[name];
  }
  document.querySelectorAll(".error").forEach((e) => e.textContent = "");
  for (const err of s.field_errors) {
    const el = document.querySelector(`[data-for="${err.field}"]`);
    if (el) el.textContent = err.message;
  }
  const links = document.getElementById("links");
  links.innerHTML = "";
  s.draft.navLinks.forEach((link, i) => {
    const row = document.createElement("div");
    for (const field of ["title", "url"]) {
      const input = document.createElement("input");
      input.placeholder = field; input.value = link[field];
      input.onchange = () => api("PATCH", `/nav-links/${i}`, { field, value: input.value }).then((r) => r.ok && render(r.body));
      row.appendChild(input);
    }
    const remove = document.createElement("button");
    remove.type = "button"; remove.textContent = "Remove"; remove.disabled = s.draft.navLinks.length === 1;
    remove.onclick = () => api("DELETE", `/nav-links/${i}`).then((r) => r.ok && render(r.body));
    row.appendChild(remove);
    links.appendChild(row);
  });
  document.querySelectorAll("#sections input").forEach((box) => box.checked = s.draft.selectedSections.includes(box.value));
  document.getElementById("submit").disabled = !s.submit_enabled;
  document.getElementById("submit").textContent = s.phase.state === "submitting" ? "Submitting..." : "Submit";
  const notice = document.getElementById("notice");
  notice.className = "notice " + s.phase.state;
  notice.textContent = s.phase.state === "success" ? "Your project was submitted." : s.phase.state === "failed" ? s.phase.message : "";
  if (s.route === "/") window.location.href = "/";
}

async function refresh() { const r = await api("GET", ""); if (r.ok) render(r.body); }

async function start() {
  const catalog = await fetch("/api/catalog").then((r) => r.json());
  const type = document.getElementById("projectType");
  for (const t of catalog.project_types) type.add(new Option(t.name, t.id));
  for (const p of catalog.palettes) {
    const b = document.createElement("button");
    b.type = "button"; b.textContent = p.name; b.style.background = p.primary;
    b.onclick = () => api("POST", "/palette", { name: p.name }).then((r) => r.ok && render(r.body));
    document.getElementById("palettes").appendChild(b);
  }
  for (const sec of catalog.sections) {
    const label = document.createElement("label");
    const box = document.createElement("input");
    box.type = "checkbox"; box.value = sec.id;
    box.onchange = () => api("POST", `/sections/${sec.id}`).then(refresh);
    label.append(box, " " + sec.name);
    document.getElementById("sections").appendChild(label);
  }
  const opened = await fetch("/api/sessions", { method: "POST" }).then((r) => r.json());
  if (!opened.session_id) { document.getElementById("notice").textContent = opened.message; return; }
  session = opened.session_id;
  render(opened);
  const form = document.getElementById("form");
  for (const el of form.querySelectorAll("[name]")) {
    el.onchange = () => api("PUT", `/fields/${el.name}`, { value: el.value }).then((r) => r.ok ? render(r.body) : alert(r.body.message));
  }
  document.getElementById("add-link").onclick = () => api("POST", "/nav-links").then((r) => r.ok && render(r.body));
  form.onsubmit = async (ev) => {
    ev.preventDefault();
    document.getElementById("submit").disabled = true;
    const r = await api("POST", "/submit");
    if (!r.ok && r.body.code === "upstream") {
      alert(r.body.message);
      const ack = await api("POST", "/acknowledge");
      if (ack.ok) return render(ack.body);
    }
    refresh();
  };
  setInterval(refresh, 500);
  window.addEventListener("pagehide", () => fetch(`/api/sessions/${session}`, { method: "DELETE", keepalive: true }));
}
start();
</script>
</body>
</html>
"##;
