use crate::config::time_to_viral::{BASE_HOURS, DECAY_PER_POINT};
use crate::types::{MediaType, PredictionStatus, PredictionView, Similarities};

/// Build the presentation record for a scored coin.
pub fn derive_view(address: &str, mime_type: &str, scores: &Similarities) -> PredictionView {
    let prediction = scores.total;
    let status = PredictionStatus::from_score(prediction);

    PredictionView {
        id: address.to_string(),
        media_type: MediaType::from_mime(mime_type),
        prediction,
        confidence: round1((scores.sentiment + scores.embed + scores.finance) / 3.0),
        time_to_viral: time_to_viral(prediction),
        status,
        status_color: status.color(),
    }
}

/// Hours until viral; product heuristic, not a measurement.
pub fn time_to_viral(prediction: f64) -> f64 {
    round1(BASE_HOURS - prediction * DECAY_PER_POINT)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusColor;

    fn scores(total: f64) -> Similarities {
        Similarities { sentiment: 40.0, embed: 50.0, finance: 61.0, total }
    }

    #[test]
    fn status_buckets() {
        let cases = [
            (60.0, PredictionStatus::Active, StatusColor::Green),
            (59.999, PredictionStatus::Watching, StatusColor::Orange),
            (50.0, PredictionStatus::Watching, StatusColor::Orange),
            (49.999, PredictionStatus::LowPotential, StatusColor::Red),
        ];
        for (total, status, color) in cases {
            let view = derive_view("0xA", "", &scores(total));
            assert_eq!(view.status, status, "total={total}");
            assert_eq!(view.status_color, color, "total={total}");
        }
    }

    #[test]
    fn time_to_viral_at_fifty() {
        assert_eq!(time_to_viral(50.0), 12.5);
        assert_eq!(time_to_viral(0.0), 20.0);
        assert_eq!(time_to_viral(61.3), 10.8);
    }

    #[test]
    fn confidence_is_rounded_mean_of_components() {
        // (40 + 50 + 61) / 3 = 50.333…
        assert_eq!(derive_view("0xA", "", &scores(1.0)).confidence, 50.3);
    }

    #[test]
    fn media_type_from_mime() {
        assert_eq!(MediaType::from_mime("image/png"), MediaType::Image);
        assert_eq!(MediaType::from_mime("video/mp4"), MediaType::Video);
        assert_eq!(MediaType::from_mime("audio/mpeg"), MediaType::Other);
        assert_eq!(MediaType::from_mime(""), MediaType::Unknown);
    }

    #[test]
    fn view_serializes_dashboard_shape() {
        let view = derive_view("0xA", "image/gif", &scores(40.0));
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["id"], "0xA");
        assert_eq!(v["type"], "Image");
        assert_eq!(v["status"], "Low Potential");
        assert_eq!(v["statusColor"], "red");
        assert_eq!(v["timeToViral"], 14.0);
    }
}
