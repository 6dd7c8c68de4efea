//! Wire messages exchanged with the extraction service.
//!
//! The message definitions mirror `proto/extraction.proto` and are derived
//! with `prost` directly so the crate builds without `protoc`.

pub mod proto {
    /// Extract a cropped region from the source video on the service side.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExtractFromVideoRequest {
        #[prost(string, tag = "1")]
        pub media_id: ::prost::alloc::string::String,
        #[prost(uint32, tag = "2")]
        pub x1: u32,
        #[prost(uint32, tag = "3")]
        pub y1: u32,
        #[prost(uint32, tag = "4")]
        pub x2: u32,
        #[prost(uint32, tag = "5")]
        pub y2: u32,
        #[prost(uint64, tag = "6")]
        pub start_ms: u64,
        #[prost(uint64, tag = "7")]
        pub end_ms: u64,
        #[prost(uint64, tag = "8")]
        pub interval_ms: u64,
        #[prost(uint32, tag = "9")]
        pub frames_per_page: u32,
        #[prost(uint32, tag = "10")]
        pub frame_width_percent: u32,
        #[prost(uint32, tag = "11")]
        pub gap_px: u32,
    }

    /// Lay out frames that were already sampled and encoded by the client.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExtractFromFramesRequest {
        #[prost(bytes = "vec", repeated, tag = "1")]
        pub images: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
        #[prost(uint32, tag = "2")]
        pub frames_per_page: u32,
        #[prost(uint32, tag = "3")]
        pub frame_width_percent: u32,
        #[prost(uint32, tag = "4")]
        pub gap_px: u32,
        #[prost(string, tag = "5")]
        pub title: ::prost::alloc::string::String,
    }

    /// Page rasters (PNG) produced by a renderer.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RenderedDocument {
        #[prost(bytes = "vec", repeated, tag = "1")]
        pub pages: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
        #[prost(uint32, tag = "2")]
        pub page_count: u32,
    }
}

#[cfg(test)]
mod tests {
    use prost::encoding::{decode_key, decode_varint, WireType};
    use prost::Message;

    use super::proto::*;

    const SCHEMA: &str = include_str!("../proto/extraction.proto");

    /// `(tag, wire type)` of every field `message` declares in the schema,
    /// in tag order.
    fn declared_fields(message: &str) -> Vec<(u32, WireType)> {
        let header = format!("message {message} {{");
        let (_, rest) = SCHEMA.split_once(&header).expect("message in schema");
        let (body, _) = rest.split_once('}').expect("closing brace");

        let mut fields: Vec<_> = body
            .lines()
            .filter_map(|line| {
                let (decl, tag) = line.trim().strip_suffix(';')?.split_once('=')?;
                let ty = decl.split_whitespace().rev().nth(1)?;
                let wire_type = match ty {
                    "string" | "bytes" => WireType::LengthDelimited,
                    "uint32" | "uint64" => WireType::Varint,
                    other => panic!("unhandled schema type {other}"),
                };
                Some((tag.trim().parse::<u32>().expect("numeric tag"), wire_type))
            })
            .collect();
        fields.sort_by_key(|&(tag, _)| tag);
        fields
    }

    /// `(tag, wire type)` of every field present in an encoded message.
    fn encoded_fields(mut buf: &[u8]) -> Vec<(u32, WireType)> {
        let mut fields = Vec::new();
        while !buf.is_empty() {
            let (tag, wire_type) = decode_key(&mut buf).unwrap();
            match wire_type {
                WireType::Varint => {
                    decode_varint(&mut buf).unwrap();
                }
                WireType::LengthDelimited => {
                    let len = decode_varint(&mut buf).unwrap() as usize;
                    buf = &buf[len..];
                }
                other => panic!("unexpected wire type {other:?}"),
            }
            fields.push((tag, wire_type));
        }
        fields
    }

    #[test]
    fn video_request_matches_schema() {
        let req = ExtractFromVideoRequest {
            media_id: "clip.mp4".into(),
            x1: 1,
            y1: 2,
            x2: 3,
            y2: 4,
            start_ms: 5,
            end_ms: 6,
            interval_ms: 7,
            frames_per_page: 8,
            frame_width_percent: 9,
            gap_px: 10,
        };
        assert_eq!(
            encoded_fields(&req.encode_to_vec()),
            declared_fields("ExtractFromVideoRequest")
        );
    }

    #[test]
    fn frames_request_matches_schema() {
        let req = ExtractFromFramesRequest {
            images: vec![vec![0x89, 0x50]],
            frames_per_page: 2,
            frame_width_percent: 95,
            gap_px: 10,
            title: "Etude".into(),
        };
        assert_eq!(
            encoded_fields(&req.encode_to_vec()),
            declared_fields("ExtractFromFramesRequest")
        );
    }

    #[test]
    fn rendered_document_matches_schema() {
        let doc = RenderedDocument {
            pages: vec![vec![1, 2, 3]],
            page_count: 1,
        };
        assert_eq!(
            encoded_fields(&doc.encode_to_vec()),
            declared_fields("RenderedDocument")
        );
    }

    #[test]
    fn frames_request_keeps_image_order() {
        let req = ExtractFromFramesRequest {
            images: vec![vec![1], vec![2, 2], vec![3, 3, 3]],
            frames_per_page: 2,
            frame_width_percent: 95,
            gap_px: 10,
            title: "Etude".into(),
        };
        let decoded = ExtractFromFramesRequest::decode(req.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.images, req.images);
        assert_eq!(decoded.title, "Etude");
    }
}
