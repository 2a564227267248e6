mod tests {
    use die_anim::buffer::{AnimBuffer, BufferError, ByteReader, NULL_OFFSET, Offset, OffsetArray};
    use die_anim::node::{CurveKeyframe, CurveNode};

    #[test]
    fn test_reader_reads_little_endian_fields() {
        let bytes = [0x07u8, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let buffer = AnimBuffer::new(&bytes);
        let mut r = ByteReader::new(buffer, 0).unwrap();
        assert_eq!(r.read_u8().unwrap(), 0x07);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_reader_rejects_null_offset() {
        let bytes = [0u8; 8];
        let buffer = AnimBuffer::new(&bytes);
        assert_eq!(
            ByteReader::new(buffer, NULL_OFFSET).unwrap_err(),
            BufferError::OutOfBounds {
                offset: NULL_OFFSET
            }
        );
    }

    #[test]
    fn test_reader_rejects_offset_past_end() {
        let bytes = [0u8; 4];
        let buffer = AnimBuffer::new(&bytes);
        assert!(matches!(
            ByteReader::new(buffer, 4),
            Err(BufferError::OutOfBounds { offset: 4 })
        ));
    }

    #[test]
    fn test_reader_fails_on_truncated_record() {
        let bytes = [0x01u8, 0x02];
        let buffer = AnimBuffer::new(&bytes);
        let mut r = ByteReader::new(buffer, 1).unwrap();
        assert_eq!(r.read_u8().unwrap(), 0x02);
        // The u16 needs two more bytes, the buffer has none left.
        assert_eq!(
            r.read_u16().unwrap_err(),
            BufferError::OutOfBounds { offset: 1 }
        );
    }

    #[test]
    fn test_null_offset_sentinel() {
        let null: Offset<CurveKeyframe> = Offset::NULL;
        assert!(null.is_null());
        assert_eq!(null.raw(), NULL_OFFSET);
        assert!(!Offset::<CurveKeyframe>::new(0).is_null());
    }

    #[test]
    fn test_offset_array_indexing() {
        let array: OffsetArray<CurveKeyframe> = OffsetArray::new(100, 3);
        assert_eq!(array.at(0).raw(), 100);
        assert_eq!(array.at(1).raw(), 104);
        assert_eq!(array.at(2).raw(), 108);
    }

    #[test]
    fn test_offset_array_compares_by_offset_and_count() {
        let array: OffsetArray<CurveKeyframe> = OffsetArray::new(100, 3);
        assert_eq!(array, OffsetArray::new(100, 3));
        assert_ne!(array, OffsetArray::new(100, 2));
        assert_ne!(array, OffsetArray::new(104, 3));
    }

    #[test]
    fn test_decoded_keyframe_curves_compare_equal() {
        // Keyframe curve: tag 1, linear easing, 2 frames at offset 10.
        let bytes = [0x01u8, 0x01, 0x02, 0x0A, 0x00];
        let buffer = AnimBuffer::new(&bytes);
        let first = CurveNode::from_bytes(buffer, Offset::new(0)).unwrap();
        let second = CurveNode::from_bytes(buffer, Offset::new(0)).unwrap();
        assert_eq!(first, second);
        assert!(matches!(first, CurveNode::Keyframes { frames, .. } if frames.count() == 2));
    }

    #[test]
    fn test_offset_array_out_of_range_is_null() {
        let array: OffsetArray<CurveKeyframe> = OffsetArray::new(100, 3);
        assert!(array.at(3).is_null());
        assert!(array.at(255).is_null());

        let empty: OffsetArray<CurveKeyframe> = OffsetArray::new(100, 0);
        assert!(empty.is_empty());
        assert!(empty.at(0).is_null());
    }
}
