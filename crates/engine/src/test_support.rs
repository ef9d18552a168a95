//! Shared fixtures for the engine's unit tests.

use serde_json::{json, Value};
use symbridge_core::{ElementId, MemoryIndex, SemanticElement, SemanticIndex};

pub const SHAPES_JAVA: &str = "\
interface Shape {
    double area();
}
abstract class Polygon implements Shape {
    public double area() { return 0; }
}
class Square extends Polygon {
    public double area() { return side * side; }
    double twice() { return area() + area(); }
}
class Circle implements Shape {
    public double area() { return 3.14; }
}";

pub const SHAPES_GO: &str = "\
type Shape interface {
\tArea() float64
}
type Square struct {
\tside float64
}
func (s Square) Area() float64 { return s.side * s.side }";

pub const GREETER_KT: &str = "\
class Greeter {
    fun greet() { println(\"hi\") }
}";

#[allow(clippy::too_many_arguments)]
fn element(
    id: &str,
    language: &str,
    kind: &str,
    name: &str,
    qualified: &str,
    file: &str,
    line: u32,
    column: u32,
    body: (u32, u32),
    container: Option<&str>,
) -> Value {
    let mut value = json!({
        "id": id, "language": language, "kind": kind, "name": name,
        "qualified_name": qualified,
        "location": { "file": file, "line": line, "column": column },
        "body": { "start": body.0, "end": body.1 },
    });
    if let Some(container) = container {
        value["container"] = json!(container);
    }
    value
}

fn with(mut value: Value, key: &str, extra: Value) -> Value {
    value[key] = extra;
    value
}

pub fn shapes_snapshot() -> Value {
    let java = |id, kind, name, qualified, line, column, body, container| {
        element(id, "java", kind, name, qualified, "Shapes.java", line, column, body, container)
    };
    let go = |id, kind, name, qualified, line, column, body, container| {
        element(id, "go", kind, name, qualified, "shapes.go", line, column, body, container)
    };
    json!({
        "languages": ["java", "go", "kotlin"],
        "files": { "Shapes.java": SHAPES_JAVA, "shapes.go": SHAPES_GO, "Main.kt": GREETER_KT },
        "elements": [
            java("shape", "interface", "Shape", "shapes.Shape", 1, 11, (1, 3), None),
            java("shape_area", "method", "area", "shapes.Shape.area", 2, 12, (2, 2), Some("shape")),
            with(
                with(
                    java("polygon", "class", "Polygon", "shapes.Polygon", 4, 16, (4, 6), None),
                    "supertypes",
                    json!([{ "name": "Shape", "target": "shape" }, { "name": "java.lang.Object" }]),
                ),
                "detail",
                json!("abstract class Polygon"),
            ),
            with(
                java("polygon_area", "method", "area", "shapes.Polygon.area", 5, 19, (5, 5), Some("polygon")),
                "overrides",
                json!(["shape_area"]),
            ),
            with(
                java("square", "class", "Square", "shapes.Square", 7, 7, (7, 10), None),
                "supertypes",
                json!([{ "name": "Polygon", "target": "polygon" }]),
            ),
            with(
                java("square_area", "method", "area", "shapes.Square.area", 8, 19, (8, 8), Some("square")),
                "overrides",
                json!(["polygon_area"]),
            ),
            java("square_twice", "method", "twice", "shapes.Square.twice", 9, 12, (9, 9), Some("square")),
            with(
                java("circle", "class", "Circle", "shapes.Circle", 11, 7, (11, 13), None),
                "supertypes",
                json!([{ "name": "Shape", "target": "shape" }]),
            ),
            with(
                java("circle_area", "method", "area", "shapes.Circle.area", 12, 19, (12, 12), Some("circle")),
                "overrides",
                json!(["shape_area"]),
            ),
            go("go_shape", "interface", "Shape", "main.Shape", 1, 6, (1, 3), None),
            go("go_shape_area", "method", "Area", "main.Shape.Area", 2, 2, (2, 2), Some("go_shape")),
            with(
                go("go_square", "struct", "Square", "main.Square", 4, 6, (4, 6), None),
                "supertypes",
                json!([{ "name": "Shape", "target": "go_shape" }]),
            ),
            with(
                go("go_square_area", "method", "Area", "main.Square.Area", 7, 17, (7, 7), Some("go_square")),
                "overrides",
                json!(["go_shape_area"]),
            ),
            element("kt_greeter", "kotlin", "class", "Greeter", "main.Greeter", "Main.kt", 1, 7, (1, 3), None),
            element("kt_greet", "kotlin", "method", "greet", "main.Greeter.greet", "Main.kt", 2, 9, (2, 2), Some("kt_greeter")),
        ],
        "references": [
            { "target": "square_area", "file": "Shapes.java", "line": 9, "column": 29, "kind": "call" },
            { "target": "square_area", "file": "Shapes.java", "line": 9, "column": 38, "kind": "call" },
        ],
    })
}

pub fn shapes_index() -> MemoryIndex {
    MemoryIndex::from_json(&shapes_snapshot().to_string()).unwrap()
}

pub fn get(index: &MemoryIndex, id: &str) -> SemanticElement {
    index.element(&ElementId::from(id)).unwrap().unwrap()
}
