/// Fixed instructions and response schema sent with every detection request.

use serde_json::{json, Value};

pub const SYSTEM_INSTRUCTION: &str = "\
You locate wine bottle labels in photographs. \
Report every visible label as a bounding box on a 1000x1000 grid laid over the image, \
where (0, 0) is the top-left corner and (1000, 1000) the bottom-right corner, \
independent of the real image resolution. \
Answer with a JSON array only. Each element is an object with the numeric fields \
ymin, xmin, ymax, xmax, each between 0 and 1000, with ymin < ymax and xmin < xmax. \
Return an empty array when no label is visible.";

pub const USER_INSTRUCTION: &str =
    "Find the wine bottle labels in this image and return their bounding boxes.";

pub const SCHEMA_NAME: &str = "wine_label_boxes";

/// Strict schema: an array of objects with exactly the four box coordinates.
pub fn response_schema() -> Value {
    let coordinate = json!({ "type": "number", "minimum": 0, "maximum": 1000 });
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "ymin": coordinate,
                "xmin": coordinate,
                "ymax": coordinate,
                "xmax": coordinate,
            },
            "required": ["ymin", "xmin", "ymax", "xmax"],
            "additionalProperties": false,
        },
    })
}
