mod tests {
    use die_anim::buffer::{AnimBuffer, Offset};
    use die_anim::color::{BLACK, PALETTE_SIZE, Rgb, WHITE, palette_color, rainbow_wheel};
    use die_anim::eval::{ContextError, EvalContext, Globals, OverridePair, clamp_param};
    use die_anim::node::{ColorNode, CurveNode, Easing, GradientNode, interp};

    const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };

    /// Little-endian record builder mirroring the authoring side.
    #[derive(Default)]
    struct Builder {
        bytes: Vec<u8>,
    }

    impl Builder {
        fn u8(&mut self, value: u8) -> &mut Self {
            self.bytes.push(value);
            self
        }

        fn u16(&mut self, value: u16) -> &mut Self {
            self.bytes.extend_from_slice(&value.to_le_bytes());
            self
        }

        fn here(&self) -> u16 {
            u16::try_from(self.bytes.len()).unwrap()
        }

        fn scalar_u8(&mut self, value: u8) -> u16 {
            let at = self.here();
            self.u8(0).u8(value);
            at
        }

        fn scalar_u16(&mut self, value: u16) -> u16 {
            let at = self.here();
            self.u8(1).u16(value);
            at
        }

        fn unary(&mut self, op: u8, operand: u16) -> u16 {
            let at = self.here();
            self.u8(4).u8(op).u16(operand);
            at
        }

        fn binary(&mut self, op: u8, lhs: u16, rhs: u16) -> u16 {
            let at = self.here();
            self.u8(5).u8(op).u16(lhs).u16(rhs);
            at
        }

        fn color_rgb(&mut self, color: Rgb) -> u16 {
            let at = self.here();
            self.u8(0).u8(color.r).u8(color.g).u8(color.b);
            at
        }
    }

    fn context(builder: &Builder) -> EvalContext<'_> {
        EvalContext::new(AnimBuffer::new(&builder.bytes), Globals::default())
    }

    #[test]
    fn test_scalar_literals() {
        let mut b = Builder::default();
        let small = b.scalar_u8(42);
        let wide = b.scalar_u16(0x1234);
        let ctx = context(&b);
        assert_eq!(ctx.scalar(Offset::new(small)), 42);
        assert_eq!(ctx.scalar(Offset::new(wide)), 0x1234);
    }

    #[test]
    fn test_null_references_default_to_zero_and_black() {
        let b = Builder::default();
        let ctx = EvalContext::new(AnimBuffer::new(&b.bytes), Globals::default());
        assert_eq!(ctx.scalar(Offset::NULL), 0);
        assert_eq!(ctx.color(Offset::NULL), BLACK);
        assert_eq!(ctx.curve(Offset::NULL, 0x8000), 0);
        assert_eq!(ctx.gradient(Offset::NULL, 0x8000), BLACK);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let mut b = Builder::default();
        let lhs = b.scalar_u16(300);
        let rhs = b.scalar_u8(7);
        let node = b.binary(2, lhs, rhs); // mul
        let ctx = context(&b);
        let first = ctx.scalar(Offset::new(node));
        assert_eq!(first, 2100);
        for _ in 0..10 {
            assert_eq!(ctx.scalar(Offset::new(node)), first);
        }
    }

    #[test]
    fn test_global_face_input() {
        let mut b = Builder::default();
        let at = b.here();
        b.u8(2).u8(0); // global: current face
        let node = at;
        let globals = Globals {
            face_norm: 0x8000,
            device_id: 0,
        };
        let ctx = EvalContext::new(AnimBuffer::new(&b.bytes), globals);
        assert_eq!(ctx.scalar(Offset::new(node)), 0x8000);
    }

    #[test]
    fn test_unary_operators() {
        let mut b = Builder::default();
        let quarter = b.scalar_u16(0x4000); // theta 64 on the trig tables
        let zero = b.scalar_u8(0);
        let twelve = b.scalar_u8(12);
        let abs = b.unary(0, twelve);
        let sin = b.unary(1, quarter);
        let cos = b.unary(2, zero);
        let asin = b.unary(3, zero);
        let acos = b.unary(4, zero);
        let square = b.unary(5, twelve);
        let sqrt_of = b.scalar_u16(144);
        let sqrt = b.unary(6, sqrt_of);
        let ctx = context(&b);

        assert_eq!(ctx.scalar(Offset::new(abs)), 12);
        assert_eq!(ctx.scalar(Offset::new(sin)), 255 << 8);
        assert_eq!(ctx.scalar(Offset::new(cos)), 255 << 8);
        assert_eq!(ctx.scalar(Offset::new(asin)), 0);
        assert_eq!(ctx.scalar(Offset::new(acos)), 255 << 8);
        assert_eq!(ctx.scalar(Offset::new(square)), 144);
        assert_eq!(ctx.scalar(Offset::new(sqrt)), 12);
    }

    // The two inverse tables must evaluate differently: a graph asking
    // for acos gets acos, not asin.
    #[test]
    fn test_asin_and_acos_evaluate_differently() {
        let mut b = Builder::default();
        let zero = b.scalar_u8(0);
        let asin = b.unary(3, zero);
        let acos = b.unary(4, zero);
        let ctx = context(&b);
        assert_eq!(ctx.scalar(Offset::new(asin)), 0);
        assert_eq!(ctx.scalar(Offset::new(acos)), 255 << 8);
        assert_ne!(
            ctx.scalar(Offset::new(asin)),
            ctx.scalar(Offset::new(acos))
        );
    }

    #[test]
    fn test_binary_operators() {
        let mut b = Builder::default();
        let seven = b.scalar_u8(7);
        let three = b.scalar_u8(3);
        let add = b.binary(0, seven, three);
        let sub = b.binary(1, three, seven);
        let mul = b.binary(2, seven, three);
        let div = b.binary(3, seven, three);
        let modulo = b.binary(4, seven, three);
        let min = b.binary(5, seven, three);
        let max = b.binary(6, seven, three);
        let ctx = context(&b);

        assert_eq!(ctx.scalar(Offset::new(add)), 10);
        assert_eq!(ctx.scalar(Offset::new(sub)), -4);
        assert_eq!(ctx.scalar(Offset::new(mul)), 21);
        assert_eq!(ctx.scalar(Offset::new(div)), 2);
        assert_eq!(ctx.scalar(Offset::new(modulo)), 1);
        assert_eq!(ctx.scalar(Offset::new(min)), 3);
        assert_eq!(ctx.scalar(Offset::new(max)), 7);
    }

    #[test]
    fn test_division_by_zero_saturates_by_dividend_sign() {
        let mut b = Builder::default();
        let seven = b.scalar_u8(7);
        let zero = b.scalar_u8(0);
        let neg = b.binary(1, zero, seven); // 0 - 7
        let pos_div = b.binary(3, seven, zero);
        let neg_div = b.binary(3, neg, zero);
        let zero_div = b.binary(3, zero, zero);
        let ctx = context(&b);

        assert_eq!(ctx.scalar(Offset::new(pos_div)), i32::MAX);
        assert_eq!(ctx.scalar(Offset::new(neg_div)), i32::MIN);
        assert_eq!(ctx.scalar(Offset::new(zero_div)), 0);
    }

    #[test]
    fn test_modulo_by_zero_is_zero() {
        let mut b = Builder::default();
        let seven = b.scalar_u8(7);
        let zero = b.scalar_u8(0);
        let node = b.binary(4, seven, zero);
        let ctx = context(&b);
        assert_eq!(ctx.scalar(Offset::new(node)), 0);
    }

    #[test]
    fn test_clamp_param() {
        assert_eq!(clamp_param(-5), 0);
        assert_eq!(clamp_param(0), 0);
        assert_eq!(clamp_param(0xFFFF), 0xFFFF);
        assert_eq!(clamp_param(0x1_0000), 0xFFFF);
        assert_eq!(clamp_param(i32::MAX), 0xFFFF);
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            Easing::Step,
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
        ] {
            assert_eq!(easing.apply(0), 0, "{easing:?} at 0");
            assert_eq!(easing.apply(0xFFFF), 0xFFFF, "{easing:?} at max");
        }
        assert_eq!(Easing::Step.apply(0x7FFF), 0);
        assert_eq!(Easing::Step.apply(0x8000), 0xFFFF);
        assert_eq!(Easing::Linear.apply(0x1234), 0x1234);
        // Quadratic ease-in stays below linear in the first half.
        assert!(Easing::EaseIn.apply(0x4000) < 0x4000);
        assert!(Easing::EaseOut.apply(0x4000) > 0x4000);
    }

    #[test]
    fn test_interp() {
        assert_eq!(interp(0, 1000, 0), 0);
        assert_eq!(interp(0, 1000, 0xFFFF), 1000);
        assert_eq!(interp(0, 1000, 0x8000), 500);
        assert_eq!(interp(1000, 0, 0xFFFF), 0);
        assert_eq!(interp(-100, 100, 0x8000), 0);
    }

    #[test]
    fn test_two_point_curve_lookup() {
        let mut b = Builder::default();
        let curve = b.here();
        b.u8(0).u8(1).u16(0).u16(1000); // two-point, linear, 0 -> 1000
        let input = b.scalar_u16(0x8000);
        let node = b.here();
        b.u8(3).u16(curve).u16(input); // lookup
        let ctx = context(&b);
        assert_eq!(ctx.scalar(Offset::new(node)), 500);
        assert_eq!(ctx.curve(Offset::<CurveNode>::new(curve), 0), 0);
        assert_eq!(ctx.curve(Offset::<CurveNode>::new(curve), 0xFFFF), 1000);
    }

    #[test]
    fn test_keyframe_curve_segments() {
        let mut b = Builder::default();
        let frames = b.here();
        b.u16(0).u16(100); // t=0 -> 100
        b.u16(0x8000).u16(200); // t=half -> 200
        b.u16(0xFFFF).u16(300); // t=end -> 300
        let curve = b.here();
        b.u8(1).u8(1).u8(3).u16(frames); // keyframes, linear, 3 frames
        let ctx = context(&b);
        let curve = Offset::<CurveNode>::new(curve);

        assert_eq!(ctx.curve(curve, 0), 100);
        assert_eq!(ctx.curve(curve, 0x8000), 200);
        assert_eq!(ctx.curve(curve, 0xFFFF), 300);
        // Mid-segment interpolation stays between the bracketing frames.
        let mid = ctx.curve(curve, 0x4000);
        assert!(mid > 100 && mid < 200, "got {mid}");
    }

    #[test]
    fn test_two_color_gradient() {
        let mut b = Builder::default();
        let from = b.color_rgb(RED);
        let to = b.color_rgb(BLUE);
        let gradient = b.here();
        b.u8(0).u8(1).u16(from).u16(to); // two-color, linear
        let ctx = context(&b);
        let gradient = Offset::<GradientNode>::new(gradient);

        assert_eq!(ctx.gradient(gradient, 0), RED);
        assert_eq!(ctx.gradient(gradient, 0xFFFF), BLUE);
        let mid = ctx.gradient(gradient, 0x8000);
        assert!(mid.r > 0 && mid.b > 0);
    }

    #[test]
    fn test_rainbow_gradient_walks_the_hue_wheel() {
        let mut b = Builder::default();
        let gradient = b.here();
        b.u8(1).u8(1); // rainbow, one cycle
        let ctx = context(&b);
        let gradient = Offset::<GradientNode>::new(gradient);

        assert_eq!(ctx.gradient(gradient, 0), rainbow_wheel(0));
        assert_eq!(ctx.gradient(gradient, 0x8000), rainbow_wheel(128));
    }

    #[test]
    fn test_keyframe_gradient() {
        let mut b = Builder::default();
        let red = b.color_rgb(RED);
        let blue = b.color_rgb(BLUE);
        let frames = b.here();
        b.u16(0).u16(red);
        b.u16(0xFFFF).u16(blue);
        let gradient = b.here();
        b.u8(2).u8(1).u8(2).u16(frames); // keyframes, linear, 2 frames
        let ctx = context(&b);
        let gradient = Offset::<GradientNode>::new(gradient);

        assert_eq!(ctx.gradient(gradient, 0), RED);
        assert_eq!(ctx.gradient(gradient, 0xFFFF), BLUE);
    }

    #[test]
    fn test_color_nodes() {
        let mut b = Builder::default();
        let rgb = b.color_rgb(RED);
        let palette = b.here();
        b.u8(1).u8(61); // palette index in the white band
        let ctx = context(&b);

        assert_eq!(ctx.color(Offset::<ColorNode>::new(rgb)), RED);
        assert_eq!(ctx.color(Offset::<ColorNode>::new(palette)), WHITE);
    }

    #[test]
    fn test_palette_tiers() {
        // Same hue, halving brightness per tier.
        let full = palette_color(0);
        let half = palette_color(20);
        let quarter = palette_color(40);
        assert!(full.r > half.r && half.r > quarter.r);
        for index in 60..64 {
            assert_eq!(palette_color(index), WHITE);
        }
        // Indices wrap modulo the palette size.
        assert_eq!(palette_color(PALETTE_SIZE), palette_color(0));
    }

    #[test]
    fn test_unknown_scalar_tag_defaults_to_zero() {
        let mut b = Builder::default();
        let at = b.here();
        b.u8(250).u8(9);
        let ctx = context(&b);
        assert_eq!(ctx.scalar(Offset::new(at)), 0);
    }

    #[test]
    fn test_unknown_color_tag_defaults_to_black() {
        let mut b = Builder::default();
        let at = b.here();
        b.u8(250).u8(9).u8(9);
        let ctx = context(&b);
        assert_eq!(ctx.color(Offset::new(at)), BLACK);
    }

    #[test]
    fn test_override_redirects_a_reference() {
        let mut primary = Builder::default();
        let node = primary.scalar_u8(5);
        let mut replacement = Builder::default();
        let other = replacement.scalar_u8(9);

        let pairs = [OverridePair {
            source: node,
            replacement: other,
        }];
        let ctx = EvalContext::with_overrides(
            AnimBuffer::new(&primary.bytes),
            AnimBuffer::new(&replacement.bytes),
            &pairs,
            Globals::default(),
        )
        .unwrap();
        assert_eq!(ctx.scalar(Offset::new(node)), 9);

        let plain = EvalContext::new(AnimBuffer::new(&primary.bytes), Globals::default());
        assert_eq!(plain.scalar(Offset::new(node)), 5);
    }

    #[test]
    fn test_override_applies_through_parent_nodes() {
        let mut primary = Builder::default();
        let lhs = primary.scalar_u8(5);
        let rhs = primary.scalar_u8(3);
        let sum = primary.binary(0, lhs, rhs);
        let mut replacement = Builder::default();
        let other = replacement.scalar_u16(1000);

        let pairs = [OverridePair {
            source: rhs,
            replacement: other,
        }];
        let ctx = EvalContext::with_overrides(
            AnimBuffer::new(&primary.bytes),
            AnimBuffer::new(&replacement.bytes),
            &pairs,
            Globals::default(),
        )
        .unwrap();
        // The child reference resolves through the override table even
        // though the parent itself is untouched.
        assert_eq!(ctx.scalar(Offset::new(sum)), 1005);
    }

    #[test]
    fn test_duplicate_override_is_rejected() {
        let bytes = [0u8, 1];
        let pairs = [
            OverridePair {
                source: 0,
                replacement: 0,
            },
            OverridePair {
                source: 0,
                replacement: 2,
            },
        ];
        let result = EvalContext::with_overrides(
            AnimBuffer::new(&bytes),
            AnimBuffer::new(&bytes),
            &pairs,
            Globals::default(),
        );
        assert_eq!(
            result.err(),
            Some(ContextError::DuplicateOverride { source: 0 })
        );
    }

    #[test]
    fn test_override_table_is_bounded() {
        let bytes = [0u8, 1];
        let pairs: Vec<OverridePair> = (0..5)
            .map(|index| OverridePair {
                source: index,
                replacement: index,
            })
            .collect();
        let result = EvalContext::with_overrides(
            AnimBuffer::new(&bytes),
            AnimBuffer::new(&bytes),
            &pairs,
            Globals::default(),
        );
        assert_eq!(result.err(), Some(ContextError::TooManyOverrides));
    }
}
