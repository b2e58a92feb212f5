//! The visible-DOM snapshot protocol.
//!
//! Implementations of [`crate::Page::visible_snapshot`] evaluate this
//! script in the main document. The returned HTML is what the plan
//! generator sees, so the pruning and state-sync rules here are part of
//! the engine's contract:
//!
//! - An element is kept only when it is currently visible: not
//!   `display:none`, not `visibility:hidden`, not zero opacity, and not
//!   zero-sized with hidden overflow.
//! - Live state is synced into attributes on the clone (`value` for
//!   inputs and textareas, `checked` for checkboxes/radios, `selected`
//!   on the chosen option) so an already-filled field reads as filled
//!   and is not re-asked.

/// Script evaluated in the page to produce the pruned snapshot HTML.
pub const VISIBLE_SNAPSHOT_SCRIPT: &str = r#"
(() => {
  const visible = (el) => {
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    if (parseFloat(style.opacity) === 0) return false;
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 && rect.height === 0 && style.overflow === 'hidden') return false;
    return true;
  };

  const syncState = (src, dst) => {
    if (src instanceof HTMLInputElement) {
      if (src.type === 'checkbox' || src.type === 'radio') {
        if (src.checked) dst.setAttribute('checked', 'checked');
        else dst.removeAttribute('checked');
      } else {
        dst.setAttribute('value', src.value);
      }
    } else if (src instanceof HTMLTextAreaElement) {
      dst.textContent = src.value;
    } else if (src instanceof HTMLSelectElement) {
      const srcOpts = src.querySelectorAll('option');
      const dstOpts = dst.querySelectorAll('option');
      srcOpts.forEach((opt, i) => {
        if (!dstOpts[i]) return;
        if (opt.selected) dstOpts[i].setAttribute('selected', 'selected');
        else dstOpts[i].removeAttribute('selected');
      });
    }
  };

  const prune = (src, dst) => {
    for (const child of Array.from(src.children)) {
      if (!visible(child)) continue;
      const clone = child.cloneNode(false);
      syncState(child, clone);
      dst.appendChild(clone);
      prune(child, clone);
    }
    // Keep direct text content of the visible element.
    for (const node of Array.from(src.childNodes)) {
      if (node.nodeType === Node.TEXT_NODE && node.textContent.trim()) {
        dst.appendChild(node.cloneNode());
      }
    }
  };

  const root = document.createElement('body');
  prune(document.body, root);
  return root.innerHTML;
})()
"#;
