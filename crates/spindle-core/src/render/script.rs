//! Client delivery scripts.
//!
//! Fragment payloads are `{"id": .., "content": ..}` serialized as one JSON
//! argument to `<client>.deliver(..)`. The JSON is escaped so it cannot close
//! the surrounding `<script>` element.

use serde::Serialize;

use crate::domain::FragmentId;

/// One flushed fragment as the client receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub id: FragmentId,
    pub content: String,
}

/// Defines `window.<client>` with a `deliver` function. Fragments whose
/// placeholder element is not in the DOM yet are kept in `queue`, and
/// `flush` re-delivers them once on `DOMContentLoaded`. Anything still
/// missing its placeholder after that stays queued.
pub fn bootstrap(client: &str) -> String {
    format!(
        "<script>(function(w){{var c=w.{client}=w.{client}||{{queue:[]}};\
c.deliver=c.deliver||function(p){{var el=document.getElementById(p.id);\
if(el){{el.innerHTML=p.content;}}else{{c.queue.push(p);}}}};\
if(!c.flush){{c.flush=function(){{var q=c.queue;c.queue=[];\
q.forEach(function(p){{c.deliver(p);}});}};\
document.addEventListener(\"DOMContentLoaded\",c.flush);}}}})(window);</script>"
    )
}

pub fn delivery(client: &str, payload: &Delivery) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(payload)?;
    Ok(format!("<script>{client}.deliver({});</script>", escape_inline(&json)))
}

/// Escape characters that are significant to the HTML parser or to JS line
/// terminators. Valid only for serialized JSON: these characters can only
/// occur inside string literals there.
fn escape_inline(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}
