//! Script sources evaluated inside the host context.
//!
//! Every source here is a function expression: evaluating it yields a
//! function value and binds nothing on the global object.

/// Returns the enumerable own keys of its argument as a JSON array.
pub(crate) const OWN_KEYS_HELPER: &str = r#"
(function (target) {
  return JSON.stringify(Object.keys(target));
})
"#;

/// Whether a `[[Set]]` of `key` on the global object would succeed.
/// Follows the prototype chain the way `[[Set]]` does.
pub(crate) const ASSIGNABLE_CHECK: &str = r#"
(function (key) {
  var target = globalThis;
  while (target !== null) {
    var descriptor = Object.getOwnPropertyDescriptor(target, key);
    if (descriptor !== undefined) {
      if (!("value" in descriptor)) {
        return typeof descriptor.set === "function";
      }
      if (descriptor.writable !== true) {
        return false;
      }
      return target === globalThis || Object.isExtensible(globalThis);
    }
    target = Object.getPrototypeOf(target);
  }
  return Object.isExtensible(globalThis);
})
"#;

/// DOM factory. Called with the seed snapshot (JSON), a fragment parser
/// (markup -> snapshot JSON) and the options object (JSON). Returns the
/// controller `{ window, document, reset, detach, flushTimers, pendingTimers }`.
pub(crate) const DOM_FACTORY: &str = r##"
(function (seedJson, parseFragment, optionsJson) {
  "use strict";

  var options = JSON.parse(optionsJson);
  var detached = false;

  var VOID_ELEMENTS = ["area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "source", "track", "wbr"];
  var RAW_TEXT_ELEMENTS = ["script", "style"];

  function assertAttached(operation) {
    if (detached) {
      throw new Error("InvalidStateError: " + operation + " called on a detached document");
    }
  }

  function hidden(target, name, value) {
    Object.defineProperty(target, name, {
      value: value,
      writable: true,
      enumerable: false,
      configurable: true
    });
  }

  function escapeText(value) {
    return String(value).replace(/&/g, "&amp;").replace(/</g, "&lt;").replace(/>/g, "&gt;");
  }

  function escapeAttribute(value) {
    return String(value).replace(/&/g, "&amp;").replace(/"/g, "&quot;");
  }

  function invalidSelector(selector) {
    return new Error("SyntaxError: '" + selector + "' is not a valid selector");
  }

  // ---- events -------------------------------------------------------------

  class Event {
    constructor(type, init) {
      var settings = init || {};
      this.type = String(type);
      this.bubbles = !!settings.bubbles;
      this.cancelable = !!settings.cancelable;
      this.defaultPrevented = false;
      this.target = null;
      this.currentTarget = null;
      this.timeStamp = Date.now();
      hidden(this, "__stopped", false);
      hidden(this, "__stoppedImmediately", false);
    }

    stopPropagation() {
      this.__stopped = true;
    }

    stopImmediatePropagation() {
      this.__stopped = true;
      this.__stoppedImmediately = true;
    }

    preventDefault() {
      if (this.cancelable) {
        this.defaultPrevented = true;
      }
    }
  }

  class CustomEvent extends Event {
    constructor(type, init) {
      super(type, init);
      this.detail = init && init.detail !== undefined ? init.detail : null;
    }
  }

  function listenersOf(target) {
    if (!Object.prototype.hasOwnProperty.call(target, "__listeners")) {
      hidden(target, "__listeners", {});
    }
    return target.__listeners;
  }

  function addListener(target, type, handler) {
    if (typeof handler !== "function" && !(handler && typeof handler.handleEvent === "function")) {
      return;
    }
    var registry = listenersOf(target);
    var key = String(type);
    if (!registry[key]) {
      registry[key] = [];
    }
    if (registry[key].indexOf(handler) < 0) {
      registry[key].push(handler);
    }
  }

  function removeListener(target, type, handler) {
    var list = listenersOf(target)[String(type)];
    if (!list) {
      return;
    }
    var index = list.indexOf(handler);
    if (index >= 0) {
      list.splice(index, 1);
    }
  }

  function invokeListeners(target, event) {
    event.currentTarget = target;
    var inline = target["on" + event.type];
    if (typeof inline === "function") {
      if (inline.call(target, event) === false) {
        event.preventDefault();
      }
    }
    var list = listenersOf(target)[event.type];
    if (!list) {
      return;
    }
    list = list.slice();
    for (var i = 0; i < list.length; i += 1) {
      var handler = list[i];
      if (typeof handler === "function") {
        handler.call(target, event);
      } else {
        handler.handleEvent(event);
      }
      if (event.__stoppedImmediately) {
        return;
      }
    }
  }

  function dispatch(target, event) {
    if (!(event instanceof Event)) {
      if (!event || typeof event.type !== "string") {
        throw new TypeError("dispatchEvent requires an Event");
      }
      var wrapped = new Event(event.type, event);
      Object.keys(event).forEach(function (key) {
        if (!(key in wrapped)) {
          wrapped[key] = event[key];
        }
      });
      event = wrapped;
    }
    event.target = target;
    var path = [target];
    if (event.bubbles) {
      var cursor = target.parentNode;
      while (cursor) {
        path.push(cursor);
        cursor = cursor.parentNode;
      }
      if (path[path.length - 1] === documentObject) {
        path.push(windowObject);
      }
    }
    for (var i = 0; i < path.length; i += 1) {
      invokeListeners(path[i], event);
      if (event.__stopped) {
        break;
      }
    }
    event.currentTarget = null;
    return !event.defaultPrevented;
  }

  class EventTarget {
    addEventListener(type, handler) {
      addListener(this, type, handler);
    }

    removeEventListener(type, handler) {
      removeListener(this, type, handler);
    }

    dispatchEvent(event) {
      return dispatch(this, event);
    }
  }

  // ---- tree helpers -------------------------------------------------------

  function ownerOf(node) {
    return node.ownerDocument || node;
  }

  function isElement(node) {
    return node.nodeType === 1;
  }

  function detachNode(node) {
    var parent = node.parentNode;
    if (!parent) {
      return;
    }
    var index = parent.childNodes.indexOf(node);
    if (index >= 0) {
      parent.childNodes.splice(index, 1);
    }
    node.parentNode = null;
  }

  function removeAllChildren(node) {
    var removed = node.childNodes.splice(0, node.childNodes.length);
    removed.forEach(function (child) {
      child.parentNode = null;
    });
  }

  function attachRaw(parent, child) {
    parent.childNodes.push(child);
    child.parentNode = parent;
  }

  function walk(root, visit) {
    var stack = root.childNodes.slice().reverse();
    while (stack.length > 0) {
      var node = stack.pop();
      if (visit(node) === false) {
        return;
      }
      for (var i = node.childNodes.length - 1; i >= 0; i -= 1) {
        stack.push(node.childNodes[i]);
      }
    }
  }

  function collect(root, predicate) {
    var out = [];
    walk(root, function (node) {
      if (isElement(node) && predicate(node)) {
        out.push(node);
      }
    });
    return out;
  }

  function byTagName(root, name) {
    var wanted = String(name).toLowerCase();
    return collect(root, function (element) {
      return wanted === "*" || element.localName === wanted;
    });
  }

  function byClassName(root, names) {
    var wanted = String(names).split(/\s+/).filter(function (item) { return item.length > 0; });
    return collect(root, function (element) {
      var classes = element.className.split(/\s+/);
      return wanted.every(function (item) { return classes.indexOf(item) >= 0; });
    });
  }

  function firstChildElement(parent, name) {
    if (!parent) {
      return null;
    }
    for (var i = 0; i < parent.childNodes.length; i += 1) {
      var child = parent.childNodes[i];
      if (isElement(child) && child.localName === name) {
        return child;
      }
    }
    return null;
  }

  // ---- serialization ------------------------------------------------------

  function serializeLeaf(node) {
    if (node.nodeType === 3) {
      var parent = node.parentNode;
      if (parent && isElement(parent) && RAW_TEXT_ELEMENTS.indexOf(parent.localName) >= 0) {
        return node.data;
      }
      return escapeText(node.data);
    }
    return "<!--" + node.data + "-->";
  }

  function openTag(element) {
    var out = "<" + element.localName;
    element.__attributes.forEach(function (pair) {
      out += " " + pair[0] + "=\"" + escapeAttribute(pair[1]) + "\"";
    });
    return out + ">";
  }

  // Serializes `nodes` in order. End tags wait on the stack next to the
  // pending children, so tree depth never turns into call depth.
  function serializeNodes(nodes) {
    var out = "";
    var stack = [];
    for (var i = nodes.length - 1; i >= 0; i -= 1) {
      stack.push({ node: nodes[i], closing: false });
    }
    while (stack.length > 0) {
      var entry = stack.pop();
      var node = entry.node;
      if (entry.closing) {
        out += "</" + node.localName + ">";
      } else if (node.nodeType === 3 || node.nodeType === 8) {
        out += serializeLeaf(node);
      } else if (isElement(node)) {
        out += openTag(node);
        if (VOID_ELEMENTS.indexOf(node.localName) < 0) {
          stack.push({ node: node, closing: true });
          for (var j = node.childNodes.length - 1; j >= 0; j -= 1) {
            stack.push({ node: node.childNodes[j], closing: false });
          }
        }
      } else {
        for (var k = node.childNodes.length - 1; k >= 0; k -= 1) {
          stack.push({ node: node.childNodes[k], closing: false });
        }
      }
    }
    return out;
  }

  function serializeChildren(node) {
    return serializeNodes(node.childNodes);
  }

  function serializeNode(node) {
    return serializeNodes([node]);
  }

  // ---- selectors ----------------------------------------------------------

  function parseCompound(source) {
    var compound = { tag: null, id: null, classes: [], attributes: [] };
    var index = 0;

    function readName() {
      var start = index;
      while (index < source.length && /[A-Za-z0-9_-]/.test(source[index])) {
        index += 1;
      }
      if (index === start) {
        throw invalidSelector(source);
      }
      return source.slice(start, index);
    }

    while (index < source.length) {
      var ch = source[index];
      if (ch === "#") {
        index += 1;
        compound.id = readName();
      } else if (ch === ".") {
        index += 1;
        compound.classes.push(readName());
      } else if (ch === "[") {
        var end = source.indexOf("]", index);
        if (end < 0) {
          throw invalidSelector(source);
        }
        var body = source.slice(index + 1, end);
        var eq = body.indexOf("=");
        if (eq < 0) {
          compound.attributes.push({ name: body.trim().toLowerCase(), value: null });
        } else {
          compound.attributes.push({
            name: body.slice(0, eq).trim().toLowerCase(),
            value: body.slice(eq + 1).trim().replace(/^["']|["']$/g, "")
          });
        }
        index = end + 1;
      } else if (ch === "*" && index === 0) {
        index += 1;
      } else if (index === 0) {
        compound.tag = readName().toLowerCase();
      } else {
        throw invalidSelector(source);
      }
    }
    return compound;
  }

  function parseComplex(part) {
    var tokens = part.replace(/\s*>\s*/g, " > ").trim().split(/\s+/);
    var steps = [];
    var pending = " ";
    tokens.forEach(function (token) {
      if (token === ">") {
        if (steps.length === 0) {
          throw invalidSelector(part);
        }
        pending = ">";
        return;
      }
      steps.push({ compound: parseCompound(token), combinator: pending });
      pending = " ";
    });
    if (steps.length === 0 || pending === ">") {
      throw invalidSelector(part);
    }
    return steps;
  }

  function parseSelector(selector) {
    var text = String(selector).trim();
    if (text.length === 0) {
      throw invalidSelector(text);
    }
    return text.split(",").map(function (part) {
      return parseComplex(part.trim());
    });
  }

  function matchesCompound(element, compound) {
    if (compound.tag !== null && element.localName !== compound.tag) {
      return false;
    }
    if (compound.id !== null && element.getAttribute("id") !== compound.id) {
      return false;
    }
    var classes = element.className.split(/\s+/);
    for (var i = 0; i < compound.classes.length; i += 1) {
      if (classes.indexOf(compound.classes[i]) < 0) {
        return false;
      }
    }
    for (var j = 0; j < compound.attributes.length; j += 1) {
      var wanted = compound.attributes[j];
      var actual = element.getAttribute(wanted.name);
      if (actual === null || (wanted.value !== null && actual !== wanted.value)) {
        return false;
      }
    }
    return true;
  }

  function matchesFrom(element, steps, index) {
    if (!matchesCompound(element, steps[index].compound)) {
      return false;
    }
    if (index === 0) {
      return true;
    }
    var combinator = steps[index].combinator;
    var cursor = element.parentNode;
    while (cursor && isElement(cursor)) {
      if (matchesFrom(cursor, steps, index - 1)) {
        return true;
      }
      if (combinator === ">") {
        return false;
      }
      cursor = cursor.parentNode;
    }
    return false;
  }

  function matchesSelector(element, groups) {
    return groups.some(function (steps) {
      return matchesFrom(element, steps, steps.length - 1);
    });
  }

  function selectAll(root, selector) {
    var groups = parseSelector(selector);
    return collect(root, function (element) {
      return matchesSelector(element, groups);
    });
  }

  // ---- nodes --------------------------------------------------------------

  class Node extends EventTarget {
    constructor(ownerDocument, nodeType, nodeName) {
      super();
      this.ownerDocument = ownerDocument;
      this.nodeType = nodeType;
      this.nodeName = nodeName;
      this.parentNode = null;
      this.childNodes = [];
    }

    get firstChild() {
      return this.childNodes.length > 0 ? this.childNodes[0] : null;
    }

    get lastChild() {
      return this.childNodes.length > 0 ? this.childNodes[this.childNodes.length - 1] : null;
    }

    get parentElement() {
      return this.parentNode && isElement(this.parentNode) ? this.parentNode : null;
    }

    get nextSibling() {
      if (!this.parentNode) {
        return null;
      }
      var siblings = this.parentNode.childNodes;
      var index = siblings.indexOf(this);
      return index >= 0 && index + 1 < siblings.length ? siblings[index + 1] : null;
    }

    get previousSibling() {
      if (!this.parentNode) {
        return null;
      }
      var siblings = this.parentNode.childNodes;
      var index = siblings.indexOf(this);
      return index > 0 ? siblings[index - 1] : null;
    }

    get textContent() {
      var out = "";
      walk(this, function (node) {
        if (node.nodeType === 3) {
          out += node.data;
        }
      });
      return out;
    }

    set textContent(value) {
      assertAttached("textContent");
      removeAllChildren(this);
      var text = value == null ? "" : String(value);
      if (text.length > 0) {
        attachRaw(this, new Text(ownerOf(this), text));
      }
    }

    hasChildNodes() {
      return this.childNodes.length > 0;
    }

    contains(other) {
      var cursor = other;
      while (cursor) {
        if (cursor === this) {
          return true;
        }
        cursor = cursor.parentNode;
      }
      return false;
    }

    appendChild(child) {
      return this.insertBefore(child, null);
    }

    insertBefore(child, reference) {
      assertAttached("insertBefore");
      if (!(child instanceof Node)) {
        throw new TypeError("insertBefore: parameter 1 is not of type 'Node'");
      }
      if (this.nodeType === 3 || this.nodeType === 8) {
        throw new Error("HierarchyRequestError: this node cannot have children");
      }
      if (child.nodeType === 9 || child.contains(this)) {
        throw new Error("HierarchyRequestError: the new child contains the parent");
      }
      if (reference != null && reference.parentNode !== this) {
        throw new Error("NotFoundError: the reference node is not a child of this node");
      }
      if (reference === child) {
        return child;
      }
      var incoming = child.nodeType === 11 ? child.childNodes.slice() : [child];
      incoming.forEach(detachNode);
      var index = reference == null ? this.childNodes.length : this.childNodes.indexOf(reference);
      for (var i = 0; i < incoming.length; i += 1) {
        this.childNodes.splice(index + i, 0, incoming[i]);
        incoming[i].parentNode = this;
      }
      return child;
    }

    removeChild(child) {
      assertAttached("removeChild");
      if (!child || child.parentNode !== this) {
        throw new Error("NotFoundError: the node to be removed is not a child of this node");
      }
      detachNode(child);
      return child;
    }

    replaceChild(newChild, oldChild) {
      assertAttached("replaceChild");
      if (!oldChild || oldChild.parentNode !== this) {
        throw new Error("NotFoundError: the node to be replaced is not a child of this node");
      }
      if (newChild === oldChild) {
        return oldChild;
      }
      this.insertBefore(newChild, oldChild);
      detachNode(oldChild);
      return oldChild;
    }

    remove() {
      if (this.parentNode) {
        this.parentNode.removeChild(this);
      }
    }

    cloneNode(deep) {
      var copy = this.cloneShallow();
      if (!deep) {
        return copy;
      }
      var pending = [[this, copy]];
      while (pending.length > 0) {
        var pair = pending.pop();
        for (var i = 0; i < pair[0].childNodes.length; i += 1) {
          var child = pair[0].childNodes[i];
          var childCopy = child.cloneShallow();
          attachRaw(pair[1], childCopy);
          pending.push([child, childCopy]);
        }
      }
      return copy;
    }
  }

  Node.ELEMENT_NODE = 1;
  Node.TEXT_NODE = 3;
  Node.COMMENT_NODE = 8;
  Node.DOCUMENT_NODE = 9;
  Node.DOCUMENT_FRAGMENT_NODE = 11;

  class CharacterData extends Node {
    constructor(ownerDocument, nodeType, nodeName, data) {
      super(ownerDocument, nodeType, nodeName);
      this.data = data == null ? "" : String(data);
    }

    get nodeValue() {
      return this.data;
    }

    set nodeValue(value) {
      assertAttached("nodeValue");
      this.data = value == null ? "" : String(value);
    }

    get textContent() {
      return this.data;
    }

    set textContent(value) {
      assertAttached("textContent");
      this.data = value == null ? "" : String(value);
    }

    get length() {
      return this.data.length;
    }
  }

  class Text extends CharacterData {
    constructor(ownerDocument, data) {
      super(ownerDocument, 3, "#text", data);
    }

    cloneShallow() {
      return new Text(this.ownerDocument, this.data);
    }
  }

  class Comment extends CharacterData {
    constructor(ownerDocument, data) {
      super(ownerDocument, 8, "#comment", data);
    }

    cloneShallow() {
      return new Comment(this.ownerDocument, this.data);
    }
  }

  class Element extends Node {
    constructor(ownerDocument, localName) {
      var name = String(localName).toLowerCase();
      super(ownerDocument, 1, name.toUpperCase());
      this.localName = name;
      this.tagName = name.toUpperCase();
      this.style = {};
      hidden(this, "__attributes", []);
    }

    get id() {
      var value = this.getAttribute("id");
      return value === null ? "" : value;
    }

    set id(value) {
      this.setAttribute("id", value);
    }

    get className() {
      var value = this.getAttribute("class");
      return value === null ? "" : value;
    }

    set className(value) {
      this.setAttribute("class", value);
    }

    get classList() {
      var element = this;
      function current() {
        return element.className.split(/\s+/).filter(function (item) { return item.length > 0; });
      }
      return {
        contains: function (name) {
          return current().indexOf(String(name)) >= 0;
        },
        add: function () {
          var classes = current();
          for (var i = 0; i < arguments.length; i += 1) {
            if (classes.indexOf(String(arguments[i])) < 0) {
              classes.push(String(arguments[i]));
            }
          }
          element.className = classes.join(" ");
        },
        remove: function () {
          var removed = Array.prototype.map.call(arguments, String);
          element.className = current().filter(function (item) {
            return removed.indexOf(item) < 0;
          }).join(" ");
        },
        toggle: function (name) {
          var key = String(name);
          if (this.contains(key)) {
            this.remove(key);
            return false;
          }
          this.add(key);
          return true;
        }
      };
    }

    get attributes() {
      return this.__attributes.map(function (pair) {
        return { name: pair[0], value: pair[1] };
      });
    }

    get children() {
      return this.childNodes.filter(isElement);
    }

    get childElementCount() {
      return this.children.length;
    }

    get firstElementChild() {
      var children = this.children;
      return children.length > 0 ? children[0] : null;
    }

    get innerHTML() {
      return serializeChildren(this);
    }

    set innerHTML(markup) {
      assertAttached("innerHTML");
      var nodes = buildFragment(ownerOf(this), markup);
      removeAllChildren(this);
      var parent = this;
      nodes.forEach(function (node) {
        attachRaw(parent, node);
      });
    }

    get outerHTML() {
      return serializeNode(this);
    }

    getAttribute(name) {
      var key = String(name).toLowerCase();
      for (var i = 0; i < this.__attributes.length; i += 1) {
        if (this.__attributes[i][0] === key) {
          return this.__attributes[i][1];
        }
      }
      return null;
    }

    setAttribute(name, value) {
      assertAttached("setAttribute");
      var key = String(name).toLowerCase();
      var text = String(value);
      for (var i = 0; i < this.__attributes.length; i += 1) {
        if (this.__attributes[i][0] === key) {
          this.__attributes[i][1] = text;
          return;
        }
      }
      this.__attributes.push([key, text]);
    }

    removeAttribute(name) {
      assertAttached("removeAttribute");
      var key = String(name).toLowerCase();
      this.__attributes = this.__attributes.filter(function (pair) {
        return pair[0] !== key;
      });
    }

    hasAttribute(name) {
      return this.getAttribute(name) !== null;
    }

    getElementsByTagName(name) {
      return byTagName(this, name);
    }

    getElementsByClassName(names) {
      return byClassName(this, names);
    }

    querySelector(selector) {
      var found = selectAll(this, selector);
      return found.length > 0 ? found[0] : null;
    }

    querySelectorAll(selector) {
      return selectAll(this, selector);
    }

    matches(selector) {
      return matchesSelector(this, parseSelector(selector));
    }

    click() {
      this.dispatchEvent(new Event("click", { bubbles: true, cancelable: true }));
    }

    focus() {
      ownerOf(this).activeElement = this;
    }

    blur() {
      var owner = ownerOf(this);
      if (owner.activeElement === this) {
        owner.activeElement = null;
      }
    }

    cloneShallow() {
      var copy = new HTMLElement(this.ownerDocument, this.localName);
      copy.__attributes = this.__attributes.map(function (pair) {
        return [pair[0], pair[1]];
      });
      return copy;
    }
  }

  class HTMLElement extends Element {}

  class DocumentFragment extends Node {
    constructor(ownerDocument) {
      super(ownerDocument, 11, "#document-fragment");
    }

    getElementsByTagName(name) {
      return byTagName(this, name);
    }

    querySelector(selector) {
      var found = selectAll(this, selector);
      return found.length > 0 ? found[0] : null;
    }

    querySelectorAll(selector) {
      return selectAll(this, selector);
    }

    cloneShallow() {
      return new DocumentFragment(this.ownerDocument);
    }
  }

  class Document extends Node {
    constructor() {
      super(null, 9, "#document");
      this.defaultView = null;
      this.activeElement = null;
      this.readyState = "complete";
      this.URL = options.href;
      this.documentURI = options.href;
      this.cookie = "";
    }

    get documentElement() {
      for (var i = 0; i < this.childNodes.length; i += 1) {
        if (isElement(this.childNodes[i])) {
          return this.childNodes[i];
        }
      }
      return null;
    }

    get head() {
      return firstChildElement(this.documentElement, "head");
    }

    get body() {
      return firstChildElement(this.documentElement, "body");
    }

    get title() {
      var titles = this.head ? byTagName(this.head, "title") : [];
      if (titles.length === 0) {
        return "";
      }
      return titles[0].textContent.split(/\s+/).filter(function (item) {
        return item.length > 0;
      }).join(" ");
    }

    set title(value) {
      assertAttached("title");
      var head = this.head;
      if (!head) {
        return;
      }
      var titles = byTagName(head, "title");
      var title = titles.length > 0 ? titles[0] : null;
      if (!title) {
        title = new HTMLElement(this, "title");
        attachRaw(head, title);
      }
      title.textContent = value;
    }

    createElement(name) {
      assertAttached("createElement");
      return new HTMLElement(this, name);
    }

    createTextNode(data) {
      assertAttached("createTextNode");
      return new Text(this, data);
    }

    createComment(data) {
      assertAttached("createComment");
      return new Comment(this, data);
    }

    createDocumentFragment() {
      assertAttached("createDocumentFragment");
      return new DocumentFragment(this);
    }

    getElementById(id) {
      var wanted = String(id);
      var found = null;
      walk(this, function (node) {
        if (isElement(node) && node.getAttribute("id") === wanted) {
          found = node;
          return false;
        }
      });
      return found;
    }

    getElementsByTagName(name) {
      return byTagName(this, name);
    }

    getElementsByClassName(names) {
      return byClassName(this, names);
    }

    querySelector(selector) {
      var found = selectAll(this, selector);
      return found.length > 0 ? found[0] : null;
    }

    querySelectorAll(selector) {
      return selectAll(this, selector);
    }

    cloneShallow() {
      throw new Error("NotSupportedError: documents cannot be cloned");
    }
  }

  // ---- snapshots ----------------------------------------------------------

  // Entries arrive in preorder and name their parent by index, so every
  // parent is built before its children.
  function buildNodes(owner, json) {
    var entries = JSON.parse(json);
    var built = [];
    var roots = [];
    for (var i = 0; i < entries.length; i += 1) {
      var entry = entries[i];
      var node;
      if (entry.kind === "text") {
        node = new Text(owner, entry.data);
      } else if (entry.kind === "comment") {
        node = new Comment(owner, entry.data);
      } else {
        node = new HTMLElement(owner, entry.tag);
        for (var j = 0; j < entry.attributes.length; j += 1) {
          node.__attributes.push([entry.attributes[j][0], entry.attributes[j][1]]);
        }
      }
      built.push(node);
      if (entry.parent === null) {
        roots.push(node);
      } else {
        attachRaw(built[entry.parent], node);
      }
    }
    return roots;
  }

  function buildFragment(owner, markup) {
    var source = markup == null ? "" : String(markup);
    return buildNodes(owner, parseFragment(source));
  }

  function populate(json) {
    var nodes = buildNodes(documentObject, json);
    removeAllChildren(documentObject);
    nodes.forEach(function (node) {
      attachRaw(documentObject, node);
    });
    documentObject.activeElement = null;
  }

  // ---- timers -------------------------------------------------------------

  var timerQueue = [];
  var cancelledTimers = {};
  var nextTimerId = 1;

  function schedule(callback, delay, args, repeat) {
    if (detached) {
      return 0;
    }
    var task = callback;
    if (typeof task !== "function") {
      var source = String(callback);
      task = function () {
        (0, eval)(source);
      };
    }
    var id = nextTimerId;
    nextTimerId += 1;
    timerQueue.push({ id: id, callback: task, args: args, delay: Number(delay) || 0, repeat: repeat });
    return id;
  }

  function cancel(id) {
    cancelledTimers[String(id)] = true;
  }

  function flushTimers(limit) {
    var maxRuns = Number(limit) || 0;
    if (maxRuns < 1) {
      maxRuns = 1;
    }
    var runs = 0;
    while (!detached && timerQueue.length > 0 && runs < maxRuns) {
      var task = timerQueue.shift();
      var key = String(task.id);
      if (cancelledTimers[key]) {
        delete cancelledTimers[key];
        continue;
      }
      task.callback.apply(windowObject, task.args);
      runs += 1;
      if (task.repeat && !cancelledTimers[key] && !detached) {
        timerQueue.push(task);
      }
    }
    return runs;
  }

  // ---- window -------------------------------------------------------------

  class Storage {
    constructor() {
      hidden(this, "__items", {});
    }

    get length() {
      return Object.keys(this.__items).length;
    }

    key(index) {
      var keys = Object.keys(this.__items);
      return index >= 0 && index < keys.length ? keys[index] : null;
    }

    getItem(name) {
      var key = String(name);
      return Object.prototype.hasOwnProperty.call(this.__items, key) ? this.__items[key] : null;
    }

    setItem(name, value) {
      this.__items[String(name)] = String(value);
    }

    removeItem(name) {
      delete this.__items[String(name)];
    }

    clear() {
      this.__items = {};
    }
  }

  var documentObject = new Document();
  var windowObject = {};

  var locationObject = {
    href: options.href,
    protocol: options.protocol,
    host: options.host,
    hostname: options.hostname,
    port: options.port,
    pathname: options.pathname,
    search: options.search,
    hash: options.hash,
    origin: options.origin,
    assign: function (next) {
      locationObject.href = String(next);
    },
    replace: function (next) {
      locationObject.href = String(next);
    },
    reload: function () {},
    toString: function () {
      return locationObject.href;
    }
  };

  var historyEntries = [{ state: null, url: options.href }];
  var historyIndex = 0;
  var historyObject = {
    get length() {
      return historyEntries.length;
    },
    get state() {
      return historyEntries[historyIndex].state;
    },
    pushState: function (state, _title, url) {
      historyEntries = historyEntries.slice(0, historyIndex + 1);
      historyEntries.push({ state: state, url: url == null ? locationObject.href : String(url) });
      historyIndex = historyEntries.length - 1;
      locationObject.href = historyEntries[historyIndex].url;
    },
    replaceState: function (state, _title, url) {
      historyEntries[historyIndex] = { state: state, url: url == null ? locationObject.href : String(url) };
      locationObject.href = historyEntries[historyIndex].url;
    },
    go: function (delta) {
      var target = historyIndex + (Number(delta) || 0);
      if (target >= 0 && target < historyEntries.length) {
        historyIndex = target;
        locationObject.href = historyEntries[historyIndex].url;
      }
    },
    back: function () {
      historyObject.go(-1);
    },
    forward: function () {
      historyObject.go(1);
    }
  };

  function noop() {}

  windowObject.window = windowObject;
  windowObject.self = windowObject;
  windowObject.document = documentObject;
  windowObject.navigator = {
    userAgent: options.userAgent,
    language: options.language,
    languages: [options.language],
    platform: "",
    cookieEnabled: false,
    onLine: true
  };
  windowObject.location = locationObject;
  windowObject.history = historyObject;
  windowObject.console = { log: noop, info: noop, warn: noop, error: noop, debug: noop };
  windowObject.performance = {
    timeOrigin: Date.now(),
    now: function () {
      return Date.now() - windowObject.performance.timeOrigin;
    },
    mark: noop,
    measure: noop,
    getEntriesByType: function () {
      return [];
    }
  };
  windowObject.localStorage = new Storage();
  windowObject.sessionStorage = new Storage();
  windowObject.innerWidth = options.innerWidth;
  windowObject.innerHeight = options.innerHeight;
  windowObject.devicePixelRatio = 1;
  windowObject.setTimeout = function (callback, delay) {
    return schedule(callback, delay, Array.prototype.slice.call(arguments, 2), false);
  };
  windowObject.clearTimeout = cancel;
  windowObject.setInterval = function (callback, delay) {
    return schedule(callback, delay, Array.prototype.slice.call(arguments, 2), true);
  };
  windowObject.clearInterval = cancel;
  windowObject.requestAnimationFrame = function (callback) {
    return schedule(function () {
      callback(windowObject.performance.now());
    }, 16, [], false);
  };
  windowObject.cancelAnimationFrame = cancel;
  windowObject.queueMicrotask = function (callback) {
    schedule(callback, 0, [], false);
  };
  windowObject.getComputedStyle = function (element) {
    return element && element.style ? element.style : {};
  };
  windowObject.matchMedia = function (query) {
    return {
      media: String(query || ""),
      matches: false,
      onchange: null,
      addListener: noop,
      removeListener: noop,
      addEventListener: noop,
      removeEventListener: noop,
      dispatchEvent: function () {
        return true;
      }
    };
  };
  windowObject.alert = noop;
  windowObject.addEventListener = function (type, handler) {
    addListener(windowObject, type, handler);
  };
  windowObject.removeEventListener = function (type, handler) {
    removeListener(windowObject, type, handler);
  };
  windowObject.dispatchEvent = function (event) {
    return dispatch(windowObject, event);
  };
  windowObject.EventTarget = EventTarget;
  windowObject.Node = Node;
  windowObject.CharacterData = CharacterData;
  windowObject.Element = Element;
  windowObject.HTMLElement = HTMLElement;
  windowObject.Text = Text;
  windowObject.Comment = Comment;
  windowObject.DocumentFragment = DocumentFragment;
  windowObject.Document = Document;
  windowObject.Event = Event;
  windowObject.CustomEvent = CustomEvent;
  windowObject.Storage = Storage;

  documentObject.defaultView = windowObject;
  populate(seedJson);

  return {
    window: windowObject,
    document: documentObject,
    reset: function (json) {
      assertAttached("reset");
      populate(json);
    },
    detach: function () {
      detached = true;
      timerQueue.length = 0;
    },
    flushTimers: flushTimers,
    pendingTimers: function () {
      return timerQueue.length;
    }
  };
})
"##;
