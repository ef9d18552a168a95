#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use symbridge::{BridgeConfig, BridgeContext, MemoryIndex};

/// Builds index snapshots one declaration at a time.
#[derive(Default)]
pub struct SnapshotBuilder {
    languages: Vec<String>,
    files: BTreeMap<String, String>,
    elements: Vec<Value>,
    references: Vec<Value>,
}

impl SnapshotBuilder {
    pub fn new(languages: &[&str]) -> Self {
        Self {
            languages: languages.iter().map(|tag| tag.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn file(mut self, name: &str, text: &str) -> Self {
        self.files.insert(name.to_string(), text.to_string());
        self
    }

    /// Declaration at `line:column` of `file`, its body spanning `body` lines.
    #[allow(clippy::too_many_arguments)]
    pub fn declare(
        mut self,
        id: &str,
        language: &str,
        kind: &str,
        qualified: &str,
        file: &str,
        (line, column): (u32, u32),
        body: Option<(u32, u32)>,
        container: Option<&str>,
    ) -> Self {
        let name = qualified
            .rsplit(['.', ':'])
            .next()
            .unwrap_or(qualified)
            .to_string();
        let mut element = json!({
            "id": id, "language": language, "kind": kind, "name": name,
            "qualified_name": qualified,
            "location": { "file": file, "line": line, "column": column },
        });
        if let Some((start, end)) = body {
            element["body"] = json!({ "start": start, "end": end });
        }
        if let Some(container) = container {
            element["container"] = json!(container);
        }
        self.elements.push(element);
        self
    }

    /// Declares `supertype` as a direct supertype of `id`.
    pub fn extends(mut self, id: &str, supertype: &str) -> Self {
        let name = self
            .find(supertype)
            .and_then(|element| element["name"].as_str().map(str::to_string))
            .unwrap_or_else(|| supertype.to_string());
        let target = self.find(supertype).map(|_| supertype.to_string());
        if let Some(element) = self.find_mut(id) {
            let entry = match target {
                Some(target) => json!({ "name": name, "target": target }),
                None => json!({ "name": name }),
            };
            push_to(element, "supertypes", entry);
        }
        self
    }

    pub fn overrides(mut self, id: &str, overridden: &str) -> Self {
        if let Some(element) = self.find_mut(id) {
            push_to(element, "overrides", json!(overridden));
        }
        self
    }

    pub fn detail(mut self, id: &str, detail: &str) -> Self {
        if let Some(element) = self.find_mut(id) {
            element["detail"] = json!(detail);
        }
        self
    }

    pub fn reference(mut self, target: &str, file: &str, (line, column): (u32, u32), kind: &str) -> Self {
        self.references.push(json!({
            "target": target, "file": file, "line": line, "column": column, "kind": kind,
        }));
        self
    }

    pub fn call(self, target: &str, file: &str, at: (u32, u32)) -> Self {
        self.reference(target, file, at, "call")
    }

    pub fn snapshot(&self) -> Value {
        json!({
            "languages": self.languages,
            "files": self.files,
            "elements": self.elements,
            "references": self.references,
        })
    }

    pub fn build(self) -> MemoryIndex {
        MemoryIndex::from_json(&self.snapshot().to_string()).unwrap()
    }

    pub fn into_context(self) -> (Arc<MemoryIndex>, BridgeContext) {
        let index = Arc::new(self.build());
        let context = BridgeContext::new(index.clone(), BridgeConfig::default());
        (index, context)
    }

    fn find(&self, id: &str) -> Option<&Value> {
        self.elements.iter().find(|element| element["id"] == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.elements.iter_mut().find(|element| element["id"] == id)
    }
}

fn push_to(element: &mut Value, key: &str, entry: Value) {
    match element.get_mut(key).and_then(Value::as_array_mut) {
        Some(entries) => entries.push(entry),
        None => element[key] = json!([entry]),
    }
}

pub const COUNTER_JAVA: &str = "\
class Counter {
    private int count;
    Counter(int count) { this.count = count; }
    int getCount() { return count; }
    void setCount(int value) { count = value; }
}";

pub const MAIN_JAVA: &str = "\
class Main {
    void run(Counter c) { c.setCount(c.getCount() + 1); }
}";

/// A Java class whose field has a getter, a setter and a constructor parameter.
pub fn counter() -> SnapshotBuilder {
    let file = "Counter.java";
    SnapshotBuilder::new(&["java"])
        .file(file, COUNTER_JAVA)
        .file("Main.java", MAIN_JAVA)
        .declare("counter", "java", "class", "Counter", file, (1, 7), Some((1, 6)), None)
        .declare("count", "java", "field", "Counter.count", file, (2, 17), None, Some("counter"))
        .declare("ctor", "java", "constructor", "Counter.Counter", file, (3, 5), Some((3, 3)), Some("counter"))
        .declare("ctor_count", "java", "parameter", "Counter.Counter.count", file, (3, 17), None, Some("ctor"))
        .declare("get", "java", "method", "Counter.getCount", file, (4, 9), Some((4, 4)), Some("counter"))
        .declare("set", "java", "method", "Counter.setCount", file, (5, 10), Some((5, 5)), Some("counter"))
        .declare("main", "java", "class", "Main", "Main.java", (1, 7), Some((1, 3)), None)
        .declare("run", "java", "method", "Main.run", "Main.java", (2, 10), Some((2, 2)), Some("main"))
        .reference("count", file, (3, 31), "write")
        .reference("ctor_count", file, (3, 39), "read")
        .reference("count", file, (4, 29), "read")
        .reference("count", file, (5, 32), "write")
        .call("set", "Main.java", (2, 29))
        .call("get", "Main.java", (2, 40))
}
